use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Identifier wrapper for submitted applications. Doubles as the storage namespace for
/// the application's documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier could have been produced by [`ApplicationId::generate`].
    pub fn is_well_formed(&self) -> bool {
        Uuid::parse_str(&self.0).is_ok()
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Loan products accepted by the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanType {
    Personal,
    Home,
    Business,
    Car,
    Education,
    Gold,
}

impl LoanType {
    pub const ALL: [LoanType; 6] = [
        LoanType::Personal,
        LoanType::Home,
        LoanType::Business,
        LoanType::Car,
        LoanType::Education,
        LoanType::Gold,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            LoanType::Personal => "personal",
            LoanType::Home => "home",
            LoanType::Business => "business",
            LoanType::Car => "car",
            LoanType::Education => "education",
            LoanType::Gold => "gold",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|loan_type| loan_type.id().eq_ignore_ascii_case(value.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmploymentType {
    Salaried,
    SelfEmployed,
    Business,
    Professional,
}

impl EmploymentType {
    pub const ALL: [EmploymentType; 4] = [
        EmploymentType::Salaried,
        EmploymentType::SelfEmployed,
        EmploymentType::Business,
        EmploymentType::Professional,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            EmploymentType::Salaried => "salaried",
            EmploymentType::SelfEmployed => "self-employed",
            EmploymentType::Business => "business",
            EmploymentType::Professional => "professional",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(value.trim()))
    }
}

/// Review state of an application. New submissions always start as `Pending`.
///
/// Stored rows may carry spellings written by other tools, so decoding goes through
/// [`ApplicationStatus::parse`] and keeps anything unrecognised as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationStatus {
    Pending,
    InReview,
    Approved,
    Rejected,
    Other(String),
}

impl ApplicationStatus {
    pub fn label(&self) -> &str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::InReview => "in_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Other(raw) => raw,
        }
    }

    /// Admin-settable values only; `Other` is never produced here.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "in_review" | "in review" | "in-review" => Some(Self::InReview),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    fn from_stored(raw: String) -> Self {
        Self::parse(&raw).unwrap_or(Self::Other(raw))
    }
}

impl Serialize for ApplicationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for ApplicationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from_stored)
    }
}

/// The four optional document uploads on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentSlot {
    #[serde(rename = "panCard")]
    PanCard,
    #[serde(rename = "aadharCard")]
    AadharCard,
    #[serde(rename = "itr")]
    Itr,
    #[serde(rename = "bankStatement")]
    BankStatement,
}

impl DocumentSlot {
    pub const ALL: [DocumentSlot; 4] = [
        DocumentSlot::PanCard,
        DocumentSlot::AadharCard,
        DocumentSlot::Itr,
        DocumentSlot::BankStatement,
    ];

    /// Multipart field name, also used as the object key prefix.
    pub const fn field_name(self) -> &'static str {
        match self {
            DocumentSlot::PanCard => "panCard",
            DocumentSlot::AadharCard => "aadharCard",
            DocumentSlot::Itr => "itr",
            DocumentSlot::BankStatement => "bankStatement",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.field_name() == name)
    }
}

impl fmt::Display for DocumentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Public addresses of the uploaded documents; `None` when the slot was empty,
/// rejected, or failed to upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReferences {
    #[serde(default)]
    pub pan_card_url: Option<String>,
    #[serde(default)]
    pub aadhar_card_url: Option<String>,
    #[serde(default)]
    pub itr_url: Option<String>,
    #[serde(default)]
    pub bank_statement_url: Option<String>,
}

impl DocumentReferences {
    pub fn get(&self, slot: DocumentSlot) -> Option<&str> {
        match slot {
            DocumentSlot::PanCard => self.pan_card_url.as_deref(),
            DocumentSlot::AadharCard => self.aadhar_card_url.as_deref(),
            DocumentSlot::Itr => self.itr_url.as_deref(),
            DocumentSlot::BankStatement => self.bank_statement_url.as_deref(),
        }
    }

    pub fn set(&mut self, slot: DocumentSlot, address: String) {
        let target = match slot {
            DocumentSlot::PanCard => &mut self.pan_card_url,
            DocumentSlot::AadharCard => &mut self.aadhar_card_url,
            DocumentSlot::Itr => &mut self.itr_url,
            DocumentSlot::BankStatement => &mut self.bank_statement_url,
        };
        *target = Some(address);
    }

    pub fn is_empty(&self) -> bool {
        DocumentSlot::ALL.iter().all(|slot| self.get(*slot).is_none())
    }
}

/// Validated applicant and loan fields, ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantDetails {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub whatsapp: String,
    pub loan_type: LoanType,
    pub loan_amount: f64,
    #[serde(default)]
    pub employment_type: Option<EmploymentType>,
    #[serde(default)]
    pub monthly_income: Option<f64>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
}

/// A persisted application row. Serializes to the flat column layout of the
/// `loan_applications` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: ApplicationId,
    #[serde(flatten)]
    pub applicant: ApplicantDetails,
    #[serde(flatten)]
    pub documents: DocumentReferences,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LoanApplication {
    /// Assemble a fresh submission. Status starts at `Pending` and no review fields are set.
    pub fn new(
        id: ApplicationId,
        applicant: ApplicantDetails,
        documents: DocumentReferences,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            applicant,
            documents,
            status: ApplicationStatus::Pending,
            admin_notes: None,
            created_at,
            updated_at: None,
        }
    }

    /// Projection safe to return from the public status endpoint: no contact
    /// details and no document addresses.
    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            id: self.id.clone(),
            full_name: self.applicant.full_name.clone(),
            loan_type: self.applicant.loan_type,
            loan_amount: self.applicant.loan_amount,
            status: self.status.clone(),
            created_at: self.created_at,
        }
    }

    pub fn apply_review(&mut self, patch: &ReviewPatch) {
        if let Some(status) = &patch.status {
            self.status = status.clone();
        }
        if let Some(notes) = &patch.admin_notes {
            self.admin_notes = Some(notes.clone());
        }
        self.updated_at = Some(patch.updated_at);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationStatusView {
    pub id: ApplicationId,
    pub full_name: String,
    pub loan_type: LoanType,
    pub loan_amount: f64,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

/// Admin change set. Absent fields are left untouched; `updated_at` is always written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApplicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}
