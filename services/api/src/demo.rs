use clap::Args;
use loan_intake::catalog;
use loan_intake::config::{DocumentPolicy, IntakeConfig};
use loan_intake::error::AppError;
use loan_intake::intake::{
    DocumentPart, DocumentSlot, InMemoryApplicationRepository, InMemoryObjectStore,
    IntakeService, LoanType, ReviewRequest, SubmissionForm,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Loan product to apply for
    #[arg(long, default_value = "personal")]
    pub(crate) loan_type: String,
    /// Requested amount in rupees
    #[arg(long, default_value = "500000")]
    pub(crate) loan_amount: String,
    /// Applicant mobile number (10 digits starting with 6-9)
    #[arg(long, default_value = "9876543210")]
    pub(crate) phone: String,
    /// PAN card scan to attach
    #[arg(long)]
    pub(crate) pan_card: Option<PathBuf>,
    /// Aadhaar card scan to attach
    #[arg(long)]
    pub(crate) aadhar_card: Option<PathBuf>,
    /// Income tax return to attach
    #[arg(long)]
    pub(crate) itr: Option<PathBuf>,
    /// Bank statement to attach
    #[arg(long)]
    pub(crate) bank_statement: Option<PathBuf>,
    /// Reject the whole submission when any attachment fails screening
    #[arg(long)]
    pub(crate) strict: bool,
    /// Skip the admin review portion of the demo
    #[arg(long)]
    pub(crate) skip_review: bool,
}

pub(crate) fn document_part(slot: DocumentSlot, path: &Path) -> Result<DocumentPart, AppError> {
    let bytes = std::fs::read(path)?;
    Ok(DocumentPart {
        slot,
        file_name: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
        content_type: mime_guess::from_path(path).first_raw().map(str::to_string),
        bytes,
    })
}

fn demo_form(args: &DemoArgs) -> Result<SubmissionForm, AppError> {
    let mut form = SubmissionForm::default()
        .field("fullName", "Asha Rao")
        .field("email", "asha@example.com")
        .field("phone", &args.phone)
        .field("loanType", &args.loan_type)
        .field("loanAmount", &args.loan_amount)
        .field("employmentType", "salaried")
        .field("monthlyIncome", "85000")
        .field("city", "Pune")
        .field("state", "Maharashtra")
        .field("pincode", "411001");

    let attachments = [
        (DocumentSlot::PanCard, &args.pan_card),
        (DocumentSlot::AadharCard, &args.aadhar_card),
        (DocumentSlot::Itr, &args.itr),
        (DocumentSlot::BankStatement, &args.bank_statement),
    ];
    for (slot, path) in attachments {
        if let Some(path) = path {
            form = form.document(document_part(slot, path)?);
        }
    }

    Ok(form)
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = IntakeConfig {
        document_policy: if args.strict {
            DocumentPolicy::Strict
        } else {
            DocumentPolicy::Isolate
        },
        ..IntakeConfig::default()
    };
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let objects = Arc::new(InMemoryObjectStore::default());
    let service = IntakeService::new(repository.clone(), objects.clone(), &config);

    println!("Loan intake demo");
    if let Some(product) = LoanType::parse(&args.loan_type).and_then(catalog::product) {
        println!(
            "- Product: {} (₹{} - ₹{}, {})",
            product.name, product.min_amount, product.max_amount, product.interest_rate
        );
    }

    let form = demo_form(&args)?;
    let receipt = match service.submit(form).await {
        Ok(receipt) => receipt,
        Err(err) => {
            println!("  Submission rejected: {err}");
            return Ok(());
        }
    };

    println!(
        "- Received application {} -> status {}",
        receipt.application_id,
        receipt.record.status.label()
    );
    for slot in DocumentSlot::ALL {
        if let Some(address) = receipt.record.documents.get(slot) {
            println!("  {slot}: {address}");
        }
    }
    for rejection in &receipt.rejected_documents {
        println!("  rejected {rejection}");
    }
    for slot in &receipt.failed_uploads {
        println!("  upload failed for {slot}");
    }
    println!(
        "  {} object(s) stored, {} record(s) persisted",
        objects.keys().len(),
        repository.len()
    );

    if args.skip_review {
        return Ok(());
    }

    let reviewed = service
        .review(
            &receipt.application_id,
            ReviewRequest {
                status: Some("approved".to_string()),
                notes: Some("Documents verified".to_string()),
            },
        )
        .await;
    match reviewed {
        Ok(record) => println!(
            "- Review: status {} | notes {:?}",
            record.status.label(),
            record.admin_notes.unwrap_or_default()
        ),
        Err(err) => println!("  Review failed: {err}"),
    }

    match service.status(&receipt.application_id).await {
        Ok(view) => println!(
            "- Public status for {}: {} ({} loan of ₹{})",
            view.full_name,
            view.status.label(),
            view.loan_type.id(),
            view.loan_amount
        ),
        Err(err) => println!("  Status lookup failed: {err}"),
    }

    Ok(())
}
