//! Helpers for turning `validator` failures into [`AuthError::Validation`].

use validator::{Validate, ValidationErrors};

use crate::errors::AuthError;

/// Flattens field errors into a single comma separated message.
///
/// Fields are sorted so the message is stable across runs.
pub fn format_errors(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|msg| msg.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Runs the `validator` rules on a DTO.
pub fn validate_dto<T: Validate>(dto: &T) -> Result<(), AuthError> {
    dto.validate()
        .map_err(|errors| AuthError::Validation(format_errors(&errors)))
}
