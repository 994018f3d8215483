use std::fmt;

use super::domain::{NationalId, Neighborhood, NewRequest, RequestSubmission};
use super::photo::reencode_as_jpeg;

/// Number of digits a national ID must reduce to.
pub const NATIONAL_ID_DIGITS: usize = 11;

/// Form fields that must be filled in before a request is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    Name,
    NationalId,
    Phone,
    Address,
    Photo,
}

impl RequiredField {
    pub const fn label(self) -> &'static str {
        match self {
            RequiredField::Name => "name",
            RequiredField::NationalId => "national_id",
            RequiredField::Phone => "phone",
            RequiredField::Address => "address",
            RequiredField::Photo => "photo",
        }
    }
}

/// One reason a submission was turned away.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{} is required", .0.label())]
    MissingField(RequiredField),
    #[error("national ID must contain exactly 11 digits (found {digits})")]
    InvalidFormat { digits: usize },
    #[error("unknown neighborhood '{0}'")]
    UnknownNeighborhood(String),
    #[error("photo could not be read as an image: {0}")]
    InvalidPhoto(String),
}

impl ValidationError {
    /// Form field the failure belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField(field) => field.label(),
            ValidationError::InvalidFormat { .. } => RequiredField::NationalId.label(),
            ValidationError::UnknownNeighborhood(_) => "neighborhood",
            ValidationError::InvalidPhoto(_) => RequiredField::Photo.label(),
        }
    }
}

/// Every failure found in a single submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "submission rejected: ")?;
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Strip every non-digit and accept the result only if exactly 11 digits remain.
/// No checksum is computed.
pub fn normalize_and_validate_national_id(raw: &str) -> Result<NationalId, ValidationError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == NATIONAL_ID_DIGITS {
        Ok(NationalId(digits))
    } else {
        Err(ValidationError::InvalidFormat {
            digits: digits.len(),
        })
    }
}

/// Report every required field that is missing or blank.
pub fn validate_required(submission: &RequestSubmission) -> Result<(), Vec<ValidationError>> {
    let text_fields = [
        (RequiredField::Name, submission.name.as_str()),
        (RequiredField::NationalId, submission.national_id.as_str()),
        (RequiredField::Phone, submission.phone.as_str()),
        (RequiredField::Address, submission.address.as_str()),
    ];

    let mut missing: Vec<ValidationError> = text_fields
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| ValidationError::MissingField(field))
        .collect();

    if submission.photo.as_ref().map_or(true, Vec::is_empty) {
        missing.push(ValidationError::MissingField(RequiredField::Photo));
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}

/// Run every check and turn the submission into an insertable request.
///
/// Nothing short-circuits: the resident gets the complete list of problems in one
/// response. The photo is re-encoded here because decoding it is the only way to
/// know it is an image.
pub fn validate_submission(submission: RequestSubmission) -> Result<NewRequest, ValidationErrors> {
    let mut errors = validate_required(&submission).err().unwrap_or_default();

    let national_id = if submission.national_id.trim().is_empty() {
        None
    } else {
        match normalize_and_validate_national_id(&submission.national_id) {
            Ok(national_id) => Some(national_id),
            Err(error) => {
                errors.push(error);
                None
            }
        }
    };

    let neighborhood = Neighborhood::from_label(&submission.neighborhood);
    if neighborhood.is_none() {
        errors.push(ValidationError::UnknownNeighborhood(
            submission.neighborhood.trim().to_string(),
        ));
    }

    let photo = match submission.photo.as_deref() {
        Some(bytes) if !bytes.is_empty() => match reencode_as_jpeg(bytes) {
            Ok(encoded) => Some(encoded),
            Err(error) => {
                errors.push(ValidationError::InvalidPhoto(error.to_string()));
                None
            }
        },
        _ => None,
    };

    match (national_id, neighborhood, photo) {
        (Some(national_id), Some(neighborhood), Some(photo)) if errors.is_empty() => {
            Ok(NewRequest {
                name: submission.name,
                national_id,
                phone: submission.phone,
                neighborhood,
                address: submission.address,
                comment: submission.comment,
                photo: Some(photo),
            })
        }
        _ => Err(ValidationErrors(errors)),
    }
}
