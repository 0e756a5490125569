use anyhow::{Context, Result};
use jupiter_model::CourseRecord;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("record #{index}: missing required field: {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("course '{0}' has no title, attributes, syllabus, or page text")]
    EmptyRecord(String),

    #[error("course '{0}' has an attribute with an empty name")]
    EmptyAttributeKey(String),

    #[error("course '{code}' has an empty value for attribute '{key}'")]
    EmptyAttributeValue { code: String, key: String },
}

/// Validate a structured-data output file (a JSON array of course records).
///
/// Returns the findings; an unreadable or malformed file is an error.
pub fn validate(file_path: &str) -> Result<Vec<ValidationError>> {
    let contents =
        std::fs::read_to_string(file_path).with_context(|| format!("Failed to read {file_path}"))?;
    let records: Vec<CourseRecord> = serde_json::from_str(&contents)
        .with_context(|| format!("{file_path} is not a JSON array of course records"))?;

    let errors = validate_records(&records);
    tracing::info!(
        path = %file_path,
        records = records.len(),
        errors = errors.len(),
        "Validated course records"
    );

    Ok(errors)
}

/// Check each record against the invariants every written record must hold.
pub fn validate_records(records: &[CourseRecord]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (index, record) in records.iter().enumerate() {
        if record.code.trim().is_empty() {
            errors.push(ValidationError::MissingField { index, field: "code" });
        }
        if record.source_url.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                index,
                field: "source_url",
            });
        }

        // Structured fields may all be missing, but then the fallback text must carry something.
        if record.is_unstructured() && record.full_text.trim().is_empty() {
            errors.push(ValidationError::EmptyRecord(record.code.clone()));
        }

        for (key, value) in &record.attributes {
            if key.trim().is_empty() {
                errors.push(ValidationError::EmptyAttributeKey(record.code.clone()));
            } else if value.trim().is_empty() {
                errors.push(ValidationError::EmptyAttributeValue {
                    code: record.code.clone(),
                    key: key.clone(),
                });
            }
        }
    }

    for e in &errors {
        tracing::warn!("{e}");
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str) -> CourseRecord {
        CourseRecord {
            code: code.into(),
            source_url: format!("https://uspdigital.usp.br/jupiterweb/obterDisciplina?sgldis={code}"),
            title: Some("Tratamento e Análise de Dados".into()),
            attributes: Default::default(),
            syllabus: None,
            full_text: "Tratamento e Análise de Dados".into(),
        }
    }

    #[test]
    fn test_valid_records() {
        assert!(validate_records(&[record("ACH0021"), record("ACH0021")]).is_empty());
    }

    #[test]
    fn test_unstructured_record_with_text_is_valid() {
        let mut rec = record("ACH0041");
        rec.title = None;
        assert!(validate_records(&[rec]).is_empty());
    }

    #[test]
    fn test_empty_record() {
        let mut rec = record("ACH0041");
        rec.title = None;
        rec.full_text = String::new();
        assert_eq!(
            validate_records(&[rec]),
            vec![ValidationError::EmptyRecord("ACH0041".into())]
        );
    }

    #[test]
    fn test_missing_identifiers() {
        let mut rec = record("");
        rec.source_url = " ".into();
        let errors = validate_records(&[record("ACH0021"), rec]);
        assert_eq!(
            errors,
            vec![
                ValidationError::MissingField { index: 1, field: "code" },
                ValidationError::MissingField { index: 1, field: "source_url" },
            ]
        );
    }

    #[test]
    fn test_blank_attributes() {
        let mut rec = record("ACH0021");
        rec.attributes.insert(" ".into(), "4".into());
        rec.attributes.insert("Créditos Aula".into(), "".into());
        let errors = validate_records(&[rec]);
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyAttributeKey("ACH0021".into()),
                ValidationError::EmptyAttributeValue {
                    code: "ACH0021".into(),
                    key: "Créditos Aula".into()
                },
            ]
        );
    }

    #[test]
    fn test_validate_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courses.json");
        let json = serde_json::to_string_pretty(&vec![record("ACH0021")]).unwrap();
        std::fs::write(&path, json).unwrap();

        let errors = validate(path.to_str().unwrap()).unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn test_validate_rejects_non_record_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courses.json");
        std::fs::write(&path, r#"{"code": "ACH0021"}"#).unwrap();

        assert!(validate(path.to_str().unwrap()).is_err());
    }
}
