use super::error::ApiError;
use crate::segmentation::BoxPrompt;
use axum::body::Bytes;
use axum::extract::Multipart;
use std::collections::HashMap;
use std::str::FromStr;

/// Multipart segmentation form: one upload plus scalar text fields
#[derive(Debug, Default)]
pub struct SegmentForm {
    files: HashMap<String, Bytes>,
    fields: HashMap<String, String>,
}

impl SegmentForm {
    /// Read every part; parts named in `file_fields` are kept as raw bytes
    pub async fn read(mut multipart: Multipart, file_fields: &[&str]) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if file_fields.contains(&name.as_str()) {
                let bytes = field.bytes().await?;
                tracing::debug!("Received {} upload ({} bytes)", name, bytes.len());
                form.files.insert(name, bytes);
            } else {
                let text = field.text().await?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    pub fn take_file(&mut self, name: &str) -> Result<Bytes, ApiError> {
        self.files
            .remove(name)
            .ok_or_else(|| ApiError::Form(format!("Missing required file field '{}'", name)))
    }

    pub fn required<T: FromStr>(&self, name: &str) -> Result<T, ApiError> {
        match self.fields.get(name) {
            Some(raw) => parse_field(name, raw),
            None => Err(ApiError::Form(format!("Missing required field '{}'", name))),
        }
    }

    pub fn optional<T: FromStr>(&self, name: &str, default: T) -> Result<T, ApiError> {
        match self.fields.get(name) {
            Some(raw) if !raw.trim().is_empty() => parse_field(name, raw),
            _ => Ok(default),
        }
    }

    pub fn box_prompt(&self) -> Result<BoxPrompt, ApiError> {
        Ok(BoxPrompt::new(
            self.required("x1")?,
            self.required("y1")?,
            self.required("x2")?,
            self.required("y2")?,
        ))
    }
}

fn parse_field<T: FromStr>(name: &str, raw: &str) -> Result<T, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::Form(format!("Field '{}' has invalid value '{}'", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> SegmentForm {
        SegmentForm {
            files: HashMap::new(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn parses_box_and_defaults() {
        let form = form(&[("x1", "1"), ("y1", " 2.5 "), ("x2", "10"), ("y2", "20")]);
        assert_eq!(form.box_prompt().unwrap(), BoxPrompt::new(1.0, 2.5, 10.0, 20.0));
        assert_eq!(form.optional("threshold", 0.5f32).unwrap(), 0.5);
        assert_eq!(form.optional("max_frames", 60usize).unwrap(), 60);
    }

    #[test]
    fn reports_missing_and_malformed_fields() {
        let form = form(&[("x1", "1"), ("y1", "abc"), ("max_frames", "-3")]);
        assert!(matches!(form.required::<f32>("x2"), Err(ApiError::Form(_))));
        assert!(matches!(form.required::<f32>("y1"), Err(ApiError::Form(_))));
        assert!(matches!(form.optional("max_frames", 60usize), Err(ApiError::Form(_))));
    }

    #[test]
    fn missing_upload_is_a_form_error() {
        let mut form = form(&[]);
        assert!(matches!(form.take_file("video"), Err(ApiError::Form(_))));
    }
}
