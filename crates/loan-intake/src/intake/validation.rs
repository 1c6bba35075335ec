//! Field and document rules applied to raw form submissions before anything is written.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use mime::Mime;
use serde::Serialize;

use super::domain::{ApplicantDetails, DocumentSlot, EmploymentType, LoanType};
use crate::config::DEFAULT_MAX_DOCUMENT_BYTES;

/// Raw submission as decoded from the transport: text fields keyed by form name plus any
/// file parts that matched a document slot.
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    pub fields: BTreeMap<String, String>,
    pub documents: Vec<DocumentPart>,
}

impl SubmissionForm {
    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    pub fn document(mut self, part: DocumentPart) -> Self {
        self.documents.push(part);
        self
    }
}

/// One uploaded file as received.
#[derive(Clone)]
pub struct DocumentPart {
    pub slot: DocumentSlot,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for DocumentPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentPart")
            .field("slot", &self.slot)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Which rule a field broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationRule {
    Missing,
    Format,
    OutOfRange,
    UnknownOption,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub rule: ViolationRule,
    pub message: String,
}

/// Every rule violated by a submission, in field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn has_missing_fields(&self) -> bool {
        self.violations
            .iter()
            .any(|violation| violation.rule == ViolationRule::Missing)
    }

    pub fn violation(&self, field: &str) -> Option<&FieldViolation> {
        self.violations
            .iter()
            .find(|violation| violation.field == field)
    }

    /// Single human-readable line suitable for an API `details` field.
    pub fn details(&self) -> String {
        self.violations
            .iter()
            .map(|violation| violation.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid application: {}", self.details())
    }
}

impl std::error::Error for ValidationError {}

struct Violations(Vec<FieldViolation>);

impl Violations {
    fn push(&mut self, field: &'static str, rule: ViolationRule, message: impl Into<String>) {
        self.0.push(FieldViolation {
            field,
            rule,
            message: message.into(),
        });
    }

    fn missing(&mut self, field: &'static str) {
        self.push(field, ViolationRule::Missing, format!("{field} is required"));
    }
}

fn text(fields: &BTreeMap<String, String>, name: &str) -> Option<String> {
    fields
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Check the text fields of a submission. Collects every violation instead of stopping at
/// the first one.
pub fn validate(fields: &BTreeMap<String, String>) -> Result<ApplicantDetails, ValidationError> {
    let mut violations = Violations(Vec::new());

    let full_name = text(fields, "fullName");
    if full_name.is_none() {
        violations.missing("fullName");
    }

    let email = text(fields, "email");
    match email.as_deref() {
        None => violations.missing("email"),
        Some(value) if !is_valid_email(value) => violations.push(
            "email",
            ViolationRule::Format,
            "email must be a valid email address",
        ),
        Some(_) => {}
    }

    let phone = text(fields, "phone");
    match phone.as_deref() {
        None => violations.missing("phone"),
        Some(value) if !is_mobile_number(value) => violations.push(
            "phone",
            ViolationRule::Format,
            "phone must be a 10-digit mobile number starting with 6-9",
        ),
        Some(_) => {}
    }

    let whatsapp = text(fields, "whatsapp");
    if let Some(value) = whatsapp.as_deref() {
        if !is_mobile_number(value) {
            violations.push(
                "whatsapp",
                ViolationRule::Format,
                "whatsapp must be a 10-digit mobile number starting with 6-9",
            );
        }
    }

    let loan_type = match text(fields, "loanType") {
        None => {
            violations.missing("loanType");
            None
        }
        Some(raw) => {
            let parsed = LoanType::parse(&raw);
            if parsed.is_none() {
                let options = LoanType::ALL.map(LoanType::id).join(", ");
                violations.push(
                    "loanType",
                    ViolationRule::UnknownOption,
                    format!("loanType must be one of {options}"),
                );
            }
            parsed
        }
    };

    let loan_amount = match text(fields, "loanAmount") {
        None => {
            violations.missing("loanAmount");
            None
        }
        Some(raw) => match parse_amount(&raw) {
            None => {
                violations.push(
                    "loanAmount",
                    ViolationRule::Format,
                    "loanAmount must be a number",
                );
                None
            }
            Some(amount) if amount <= 0.0 => {
                violations.push(
                    "loanAmount",
                    ViolationRule::OutOfRange,
                    "loanAmount must be greater than zero",
                );
                None
            }
            Some(amount) => Some(amount),
        },
    };

    let employment_type = text(fields, "employmentType").and_then(|raw| {
        let parsed = EmploymentType::parse(&raw);
        if parsed.is_none() {
            let options = EmploymentType::ALL.map(EmploymentType::id).join(", ");
            violations.push(
                "employmentType",
                ViolationRule::UnknownOption,
                format!("employmentType must be one of {options}"),
            );
        }
        parsed
    });

    let monthly_income = text(fields, "monthlyIncome").and_then(|raw| match parse_amount(&raw) {
        None => {
            violations.push(
                "monthlyIncome",
                ViolationRule::Format,
                "monthlyIncome must be a number",
            );
            None
        }
        Some(income) if income < 0.0 => {
            violations.push(
                "monthlyIncome",
                ViolationRule::OutOfRange,
                "monthlyIncome cannot be negative",
            );
            None
        }
        Some(income) => Some(income),
    });

    let pincode = text(fields, "pincode");
    if let Some(value) = pincode.as_deref() {
        if !is_pincode(value) {
            violations.push(
                "pincode",
                ViolationRule::Format,
                "pincode must be exactly 6 digits",
            );
        }
    }

    match (full_name, email, phone, loan_type, loan_amount) {
        (Some(full_name), Some(email), Some(phone), Some(loan_type), Some(loan_amount))
            if violations.0.is_empty() =>
        {
            let whatsapp = whatsapp.unwrap_or_else(|| phone.clone());
            Ok(ApplicantDetails {
                full_name,
                email,
                phone,
                whatsapp,
                loan_type,
                loan_amount,
                employment_type,
                monthly_income,
                city: text(fields, "city"),
                state: text(fields, "state"),
                pincode,
            })
        }
        _ => Err(ValidationError {
            violations: violations.0,
        }),
    }
}

/// Ten digits, leading digit 6-9.
pub fn is_mobile_number(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && matches!(bytes[0], b'6'..=b'9')
        && bytes.iter().all(u8::is_ascii_digit)
}

pub fn is_pincode(value: &str) -> bool {
    value.len() == 6 && value.bytes().all(|byte| byte.is_ascii_digit())
}

pub fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    if local.is_empty()
        || local.len() > 64
        || local.starts_with('.')
        || local.ends_with('.')
        || local.contains("..")
        || local
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '@')
    {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    let tld_ok = labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));

    labels_ok && tld_ok
}

/// Per-document limits.
#[derive(Debug, Clone, Copy)]
pub struct DocumentRules {
    pub max_bytes: usize,
}

impl Default for DocumentRules {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

/// A document that passed screening, with its canonical content type and key extension.
#[derive(Clone)]
pub struct AcceptedDocument {
    pub slot: DocumentSlot,
    pub content_type: Mime,
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for AcceptedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceptedDocument")
            .field("slot", &self.slot)
            .field("content_type", &self.content_type.essence_str())
            .field("extension", &self.extension)
            .field("size", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileRejection {
    #[error("{slot}: invalid file type '{content_type}'. Only PDF, JPEG, and PNG are allowed")]
    UnsupportedType {
        slot: DocumentSlot,
        content_type: String,
    },
    #[error("{slot}: file size {size} bytes exceeds the {limit} byte limit")]
    TooLarge {
        slot: DocumentSlot,
        size: usize,
        limit: usize,
    },
}

impl FileRejection {
    pub fn slot(&self) -> DocumentSlot {
        match self {
            FileRejection::UnsupportedType { slot, .. } | FileRejection::TooLarge { slot, .. } => {
                *slot
            }
        }
    }
}

/// PDF, JPEG (including the `image/jpg` alias) and PNG, mapped to their canonical type
/// and key extension.
fn canonical_type(candidate: &Mime) -> Option<(Mime, &'static str)> {
    match candidate.essence_str() {
        "application/pdf" => Some((mime::APPLICATION_PDF, "pdf")),
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some((mime::IMAGE_JPEG, "jpg")),
        "image/png" => Some((mime::IMAGE_PNG, "png")),
        _ => None,
    }
}

fn guess_from_name(file_name: Option<&str>) -> Option<Mime> {
    file_name.and_then(|name| mime_guess::from_path(name).first())
}

/// Extension taken from the original file name when it agrees with the content type.
fn file_extension(file_name: Option<&str>, content_type: &Mime) -> Option<&'static str> {
    let guessed = guess_from_name(file_name)?;
    let (guessed_type, _) = canonical_type(&guessed)?;
    if guessed_type != *content_type {
        return None;
    }

    let raw = Path::new(file_name?).extension()?.to_str()?.to_ascii_lowercase();
    ["pdf", "jpg", "jpeg", "png"]
        .into_iter()
        .find(|known| *known == raw)
}

/// Screen one uploaded file against the type and size rules.
pub fn screen_document(
    part: DocumentPart,
    rules: &DocumentRules,
) -> Result<AcceptedDocument, FileRejection> {
    let declared = part
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse::<Mime>().ok())
        .filter(|value| *value != mime::APPLICATION_OCTET_STREAM);

    let resolved = declared.or_else(|| guess_from_name(part.file_name.as_deref()));

    let Some((content_type, default_extension)) = resolved.as_ref().and_then(canonical_type)
    else {
        let content_type = resolved
            .map(|value| value.essence_str().to_string())
            .or(part.content_type)
            .unwrap_or_else(|| "unknown".to_string());
        return Err(FileRejection::UnsupportedType {
            slot: part.slot,
            content_type,
        });
    };

    if part.bytes.len() > rules.max_bytes {
        return Err(FileRejection::TooLarge {
            slot: part.slot,
            size: part.bytes.len(),
            limit: rules.max_bytes,
        });
    }

    let extension =
        file_extension(part.file_name.as_deref(), &content_type).unwrap_or(default_extension);

    Ok(AcceptedDocument {
        slot: part.slot,
        content_type,
        extension,
        bytes: part.bytes,
    })
}
