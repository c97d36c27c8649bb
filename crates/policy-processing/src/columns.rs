//! Column names of the source policy table and of the derived analysis columns.
//!
//! These must stay in sync with the export format of the policy database.

pub const COUNTRY: &str = "policy_country";
pub const COUNTRY_ISO_CODE: &str = "policy_country_iso_code";
pub const JURISDICTION: &str = "policy_jurisdiction";
pub const INSTRUMENT_TYPE: &str = "policy_type_of_policy_instrument";
pub const SECTOR_NAME: &str = "policy_sector_name";
pub const POLICY_TYPE: &str = "policy_type";
pub const IMPLEMENTATION_STATE: &str = "policy_implementation_state";
pub const HIGH_IMPACT: &str = "policy_high_impact";
pub const OBJECTIVE: &str = "policy_objective";

pub const DATE_OF_DECISION: &str = "policy_date_of_decision";
pub const START_DATE_OF_IMPLEMENTATION: &str = "policy_start_date_of_implementation";
pub const END_DATE_OF_IMPLEMENTATION: &str = "policy_end_date_of_implementation";

pub const IMPACT_INDICATOR_NAME: &str = "impact_indicator_name_of_impact_indicator";

pub const START_DATE_ANALYSIS: &str = "policy_start_date_analysis";
pub const END_DATE_ANALYSIS: &str = "policy_end_date_analysis";

pub const FUZZINESS: &str = "fuzziness";
pub const SECTOR_SPECIFICITY: &str = "sector_specificity";

/// Columns the cleaning pipeline cannot run without.
pub const REQUIRED_FOR_CLEANING: [&str; 7] = [
    JURISDICTION,
    INSTRUMENT_TYPE,
    SECTOR_NAME,
    IMPLEMENTATION_STATE,
    DATE_OF_DECISION,
    START_DATE_OF_IMPLEMENTATION,
    END_DATE_OF_IMPLEMENTATION,
];

/// Backend-only columns removed before analysis.
pub const BACKEND_COLUMNS: [&str; 14] = [
    "policy_title",
    "policy_name",
    "policy_supranational_region",
    "policy_subnational_region_or_state",
    "policy_city",
    "policy_description",
    "policy_stringency",
    OBJECTIVE,
    "policy_source_or_references",
    "impact_indicator_comments",
    IMPACT_INDICATOR_NAME,
    "impact_indicator_value",
    "impact_indicator_base_year",
    "impact_indicator_target_year",
];

pub const CATEGORY_COLUMNS: [&str; 8] = [
    COUNTRY,
    COUNTRY_ISO_CODE,
    JURISDICTION,
    INSTRUMENT_TYPE,
    SECTOR_NAME,
    POLICY_TYPE,
    IMPLEMENTATION_STATE,
    HIGH_IMPACT,
];

pub const YEAR_COLUMNS: [&str; 5] = [
    END_DATE_OF_IMPLEMENTATION,
    START_DATE_OF_IMPLEMENTATION,
    END_DATE_ANALYSIS,
    DATE_OF_DECISION,
    START_DATE_ANALYSIS,
];
