//! Fixed product catalog and headline statistics shown on the public site.

use serde::Serialize;

use crate::intake::LoanType;

/// One advertised loan product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanProduct {
    pub id: LoanType,
    pub name: &'static str,
    pub min_amount: u64,
    pub max_amount: u64,
    pub interest_rate: &'static str,
}

/// Aggregate marketing figures. Amounts are in crores, cashback in lakhs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_disbursed: u32,
    pub amount_disbursed: u32,
    pub happy_customers: u32,
    pub bank_partners: u32,
    pub average_interest_rate: f32,
    pub cashback_given: u32,
}

static PRODUCTS: [LoanProduct; 6] = [
    LoanProduct {
        id: LoanType::Personal,
        name: "Personal Loan",
        min_amount: 50_000,
        max_amount: 4_000_000,
        interest_rate: "10.5% - 18%",
    },
    LoanProduct {
        id: LoanType::Home,
        name: "Home Loan",
        min_amount: 500_000,
        max_amount: 100_000_000,
        interest_rate: "8.5% - 10%",
    },
    LoanProduct {
        id: LoanType::Business,
        name: "Business Loan",
        min_amount: 100_000,
        max_amount: 50_000_000,
        interest_rate: "12% - 20%",
    },
    LoanProduct {
        id: LoanType::Car,
        name: "Car Loan",
        min_amount: 100_000,
        max_amount: 10_000_000,
        interest_rate: "9% - 14%",
    },
    LoanProduct {
        id: LoanType::Education,
        name: "Education Loan",
        min_amount: 100_000,
        max_amount: 7_500_000,
        interest_rate: "8% - 12%",
    },
    LoanProduct {
        id: LoanType::Gold,
        name: "Gold Loan",
        min_amount: 10_000,
        max_amount: 5_000_000,
        interest_rate: "7% - 12%",
    },
];

pub fn loan_products() -> &'static [LoanProduct] {
    &PRODUCTS
}

pub fn product(loan_type: LoanType) -> Option<&'static LoanProduct> {
    PRODUCTS.iter().find(|product| product.id == loan_type)
}

pub fn platform_stats() -> PlatformStats {
    PlatformStats {
        total_disbursed: 15_000,
        amount_disbursed: 250,
        happy_customers: 12_500,
        bank_partners: 25,
        average_interest_rate: 8.5,
        cashback_given: 45,
    }
}
