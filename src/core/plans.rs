use super::error::ProjectionError;
use super::types::LoanPlan;

/// Annual tuition fee loan used by the student-mode balance derivation.
pub const TUITION_PER_YEAR: f64 = 9_250.0;

pub const PLAN_1: LoanPlan = LoanPlan {
    name: "Plan 1",
    annual_threshold: 24_990.0,
    repayment_rate: 0.09,
    write_off_years: 25,
    base_interest_rate: 0.0625,
};

pub const PLAN_2: LoanPlan = LoanPlan {
    name: "Plan 2",
    annual_threshold: 27_295.0,
    repayment_rate: 0.09,
    write_off_years: 30,
    base_interest_rate: 0.073,
};

pub const PLAN_4: LoanPlan = LoanPlan {
    name: "Plan 4 (Scotland)",
    annual_threshold: 31_395.0,
    repayment_rate: 0.09,
    write_off_years: 30,
    base_interest_rate: 0.0625,
};

pub const PLAN_5: LoanPlan = LoanPlan {
    name: "Plan 5",
    annual_threshold: 25_000.0,
    repayment_rate: 0.09,
    write_off_years: 40,
    base_interest_rate: 0.043,
};

pub const POSTGRADUATE: LoanPlan = LoanPlan {
    name: "Postgraduate Loan",
    annual_threshold: 21_000.0,
    repayment_rate: 0.06,
    write_off_years: 30,
    base_interest_rate: 0.073,
};

/// Canonical key order, as exposed by `/api/plans`.
pub const REGISTRY: [(&str, LoanPlan); 5] = [
    ("plan1", PLAN_1),
    ("plan2", PLAN_2),
    ("plan4", PLAN_4),
    ("plan5", PLAN_5),
    ("postgraduate", POSTGRADUATE),
];

pub fn lookup_plan(key: &str) -> Result<&'static LoanPlan, ProjectionError> {
    match key {
        "plan1" => Ok(&PLAN_1),
        "plan2" => Ok(&PLAN_2),
        // Plan 3 is the official name of the postgraduate loan.
        "plan3" | "postgraduate" => Ok(&POSTGRADUATE),
        "plan4" => Ok(&PLAN_4),
        "plan5" => Ok(&PLAN_5),
        other => Err(ProjectionError::UnknownPlan(other.to_string())),
    }
}

/// Student-mode balance: course length years of maintenance borrowing plus the
/// fixed tuition fee loan per year.
pub fn derive_student_balance(course_length_years: u32, maintenance_per_year: f64) -> f64 {
    let years = course_length_years as f64;
    maintenance_per_year * years + TUITION_PER_YEAR * years
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_resolves_every_registry_key() {
        for (key, plan) in REGISTRY {
            let found = lookup_plan(key).expect("registry key must resolve");
            assert_eq!(found.name, plan.name);
        }
    }

    #[test]
    fn plan3_is_an_alias_for_the_postgraduate_loan() {
        let plan3 = lookup_plan("plan3").expect("plan3 must resolve");
        let pg = lookup_plan("postgraduate").expect("postgraduate must resolve");
        assert_eq!(plan3, pg);
    }

    #[test]
    fn lookup_rejects_unknown_keys() {
        let err = lookup_plan("plan9").expect_err("unknown key must fail");
        assert!(err.to_string().contains("plan9"));
    }

    #[test]
    fn registry_definitions_are_well_formed() {
        for (key, plan) in REGISTRY {
            assert!(
                plan.repayment_rate > 0.0 && plan.repayment_rate <= 1.0,
                "{key}: repayment rate out of range"
            );
            assert!(plan.write_off_years > 0, "{key}: write-off years must be > 0");
            assert!(plan.annual_threshold >= 0.0, "{key}: negative threshold");
            assert!(plan.base_interest_rate >= 0.0, "{key}: negative interest");
        }
    }

    #[test]
    fn student_balance_combines_maintenance_and_tuition() {
        let balance = derive_student_balance(3, 9_000.0);
        assert_eq!(balance, 3.0 * 9_000.0 + 3.0 * TUITION_PER_YEAR);
    }

    #[test]
    fn student_balance_is_positive_even_without_maintenance() {
        assert!(derive_student_balance(1, 0.0) > 0.0);
    }
}
