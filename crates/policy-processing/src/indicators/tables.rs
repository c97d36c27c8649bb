//! Lookup and scoring tables for the indicator engine.
//!
//! The tables are plain data: each canonical taxonomy term maps to the
//! category it asserts, so the mapping can be audited and tested apart from
//! the traversal in [`super::IndicatorEngine`]. Parent headings of the
//! database taxonomy (e.g. "Economic instruments") are recognized but set no
//! indicator.

use super::categories::{InstrumentType, PolicyOption, Sector, SectorSet};
use crate::utils::normalize_token;
use std::collections::HashMap;

/// What a term of the instrument field asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentClass {
    Instrument(InstrumentType),
    Option(PolicyOption),
    Umbrella,
}

/// What a term of the sector field asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorClass {
    Sector(Sector),
    Umbrella,
}

use self::InstrumentClass as I;
use super::categories::InstrumentType as It;
use super::categories::PolicyOption as Po;

const INSTRUMENT_TERMS: &[(&str, InstrumentClass)] = &[
    // Economic instruments
    ("Economic instruments", I::Umbrella),
    ("Direct investment", I::Instrument(It::DirectInvestment)),
    ("Funds to sub-national governments", I::Instrument(It::DirectInvestment)),
    ("Infrastructure investments", I::Instrument(It::DirectInvestment)),
    ("Procurement rules", I::Instrument(It::DirectInvestment)),
    ("RD&D funding", I::Instrument(It::DirectInvestment)),
    ("Fiscal or financial incentives", I::Instrument(It::FiscalFinancialIncentives)),
    ("CO2 taxes", I::Instrument(It::FiscalFinancialIncentives)),
    ("Energy and other taxes", I::Instrument(It::FiscalFinancialIncentives)),
    ("Feed-in tariff", I::Instrument(It::FiscalFinancialIncentives)),
    ("Feed-in tariffs or premiums", I::Instrument(It::FiscalFinancialIncentives)),
    ("Grants and subsidies", I::Instrument(It::FiscalFinancialIncentives)),
    ("Loans", I::Instrument(It::FiscalFinancialIncentives)),
    ("Removal of fossil fuel subsidies", I::Instrument(It::FiscalFinancialIncentives)),
    ("Tax relief", I::Instrument(It::FiscalFinancialIncentives)),
    ("User charges", I::Instrument(It::FiscalFinancialIncentives)),
    ("Tendering schemes", I::Instrument(It::FiscalFinancialIncentives)),
    ("Market-based instruments", I::Instrument(It::MarketBasedInstruments)),
    ("GHG emissions allowances", I::Instrument(It::MarketBasedInstruments)),
    (
        "GHG emission reduction crediting and offsetting mechanism",
        I::Instrument(It::MarketBasedInstruments),
    ),
    ("Green certificates", I::Instrument(It::MarketBasedInstruments)),
    ("White certificates", I::Instrument(It::MarketBasedInstruments)),
    // Regulatory instruments
    ("Regulatory Instruments", I::Umbrella),
    ("Codes and standards", I::Instrument(It::CodesStandards)),
    ("Building codes and standards", I::Instrument(It::CodesStandards)),
    ("Product standards", I::Instrument(It::CodesStandards)),
    ("Sectoral standards", I::Instrument(It::CodesStandards)),
    ("Vehicle fuel-economy and emissions standards", I::Instrument(It::CodesStandards)),
    ("Vehicle air pollution standards", I::Instrument(It::CodesStandards)),
    ("Other mandatory requirements", I::Instrument(It::OtherRegulatoryInstruments)),
    ("Auditing", I::Instrument(It::OtherRegulatoryInstruments)),
    ("Monitoring", I::Instrument(It::OtherRegulatoryInstruments)),
    ("Obligation schemes", I::Instrument(It::OtherRegulatoryInstruments)),
    // Research, development and deployment
    // The RD&D heading contains a comma, so it reaches the table as two tokens.
    ("Research", I::Umbrella),
    ("Development and Deployment (RD&D)", I::Instrument(It::Rdd)),
    ("RD&D", I::Instrument(It::Rdd)),
    ("Research programme", I::Instrument(It::Rdd)),
    ("Technology deployment and diffusion", I::Instrument(It::Rdd)),
    ("Technology development", I::Instrument(It::Rdd)),
    ("Demonstration project", I::Instrument(It::Rdd)),
    // Information and education
    ("Information and education", I::Instrument(It::InformationEducation)),
    ("Information provision", I::Instrument(It::InformationEducation)),
    ("Performance label", I::Instrument(It::InformationEducation)),
    ("Comparison label", I::Instrument(It::InformationEducation)),
    ("Endorsement label", I::Instrument(It::InformationEducation)),
    ("Advice or aid in implementation", I::Instrument(It::InformationEducation)),
    ("Professional training and qualification", I::Instrument(It::InformationEducation)),
    // Policy-matrix options
    ("Policy support", I::Option(Po::PolicySupport)),
    ("Institutional creation", I::Option(Po::PolicySupport)),
    ("Strategic planning", I::Option(Po::PolicySupport)),
    ("Voluntary approaches", I::Option(Po::VoluntaryApproaches)),
    ("Negotiated agreements (public-private sector)", I::Option(Po::VoluntaryApproaches)),
    ("Public voluntary schemes", I::Option(Po::VoluntaryApproaches)),
    ("Unilateral commitments (private sector)", I::Option(Po::VoluntaryApproaches)),
    ("Barrier removal", I::Option(Po::BarrierRemoval)),
    ("Grid access and priority for renewables", I::Option(Po::BarrierRemoval)),
    ("Net metering", I::Option(Po::BarrierRemoval)),
    ("Removal of split incentives (landlord tenant problem)", I::Option(Po::BarrierRemoval)),
    ("Climate strategy", I::Option(Po::ClimateStrategy)),
    ("Political & non-binding climate strategy", I::Option(Po::ClimateStrategy)),
    ("Formal & legally binding climate strategy", I::Option(Po::ClimateStrategy)),
    ("Coordinating body for climate strategy", I::Option(Po::ClimateStrategy)),
    ("Target", I::Option(Po::Target)),
    ("GHG reduction target", I::Option(Po::Target)),
    ("Renewable energy target", I::Option(Po::Target)),
    ("Energy efficiency target", I::Option(Po::Target)),
    ("Other target", I::Option(Po::Target)),
];

use self::SectorClass as S;

const SECTOR_TERMS: &[(&str, SectorClass)] = &[
    ("General", S::Sector(Sector::General)),
    ("Cross-sector", S::Sector(Sector::General)),
    ("Electricity and heat", S::Sector(Sector::Electricity)),
    ("Electricity", S::Sector(Sector::Electricity)),
    ("Heat", S::Sector(Sector::Electricity)),
    ("Fossil fuel power", S::Sector(Sector::Electricity)),
    ("Nuclear", S::Sector(Sector::Electricity)),
    ("Renewables", S::Sector(Sector::Electricity)),
    ("CCS", S::Sector(Sector::Electricity)),
    ("Industry", S::Sector(Sector::Industry)),
    ("Industrial energy related", S::Sector(Sector::Industry)),
    ("Industrial process emissions", S::Sector(Sector::Industry)),
    ("Industrial N2O", S::Sector(Sector::Industry)),
    ("Fluorinated gases", S::Sector(Sector::Industry)),
    ("Fossil fuel production", S::Sector(Sector::Industry)),
    ("Waste", S::Sector(Sector::Industry)),
    ("Buildings", S::Sector(Sector::Buildings)),
    ("Residential buildings", S::Sector(Sector::Buildings)),
    ("Commercial buildings", S::Sector(Sector::Buildings)),
    ("Appliances", S::Sector(Sector::Buildings)),
    ("Construction", S::Sector(Sector::Buildings)),
    ("Heating and cooling", S::Sector(Sector::Buildings)),
    ("Hot water and cooking", S::Sector(Sector::Buildings)),
    ("Transport", S::Sector(Sector::Transport)),
    ("Low-emissions mobility", S::Sector(Sector::Transport)),
    ("Air", S::Sector(Sector::Transport)),
    ("Rail", S::Sector(Sector::Transport)),
    ("Shipping", S::Sector(Sector::Transport)),
    ("Heavy-duty vehicles", S::Sector(Sector::Transport)),
    ("Light-duty vehicles", S::Sector(Sector::Transport)),
    ("Transport infrastructure", S::Sector(Sector::Transport)),
    ("Agriculture and forestry", S::Sector(Sector::Land)),
    ("Land use", S::Sector(Sector::Land)),
    ("Agricultural CH4", S::Sector(Sector::Land)),
    ("Agricultural N2O", S::Sector(Sector::Land)),
    ("Forestry", S::Sector(Sector::Land)),
    ("Energy service demand reduction and resource efficiency", S::Umbrella),
    ("Supply-side", S::Umbrella),
];

/// Fuzziness by number of specific sectors (index 0..=5).
pub const DEFAULT_FUZZINESS_BY_COUNT: [f64; 6] = [0.0, 0.0, 0.2, 0.4, 0.6, 0.8];

/// Fuzziness of any policy flagged `GeneralSector`.
pub const DEFAULT_GENERAL_FUZZINESS: f64 = 1.0;

/// Share of the economy each specific sector reaches.
pub const DEFAULT_SECTOR_REACH: [(Sector, f64); 5] = [
    (Sector::Electricity, 0.25),
    (Sector::Industry, 0.25),
    (Sector::Buildings, 0.20),
    (Sector::Transport, 0.20),
    (Sector::Land, 0.10),
];

/// Specificity per subset of the specific sectors, indexed by
/// [`SectorSet::specific_mask`].
///
/// `score(subset) = 1 - Σ reach(sector)`, rounded to four decimals, so two
/// subsets of equal size can differ (Electricity + Industry scores 0.5,
/// Buildings + Land scores 0.7). The empty subset scores 0.0.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecificityTable {
    scores: [f64; 32],
}

impl SpecificityTable {
    pub fn from_reach(reach: &[(Sector, f64)]) -> Self {
        let mut scores = [0.0; 32];
        for (mask, score) in scores.iter_mut().enumerate().skip(1) {
            let covered: f64 = Sector::SPECIFIC
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1usize << *bit) != 0)
                .map(|(_, sector)| {
                    reach
                        .iter()
                        .find(|(s, _)| s == sector)
                        .map_or(0.0, |(_, weight)| *weight)
                })
                .sum();
            *score = round4((1.0 - covered).max(0.0));
        }
        Self { scores }
    }

    pub fn score(&self, sectors: SectorSet) -> f64 {
        if sectors.is_general() {
            return 0.0;
        }
        self.scores[sectors.specific_mask()]
    }
}

/// Generality scoring parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringTables {
    pub fuzziness_by_count: [f64; 6],
    pub general_fuzziness: f64,
    pub specificity: SpecificityTable,
}

impl Default for ScoringTables {
    fn default() -> Self {
        Self {
            fuzziness_by_count: DEFAULT_FUZZINESS_BY_COUNT,
            general_fuzziness: DEFAULT_GENERAL_FUZZINESS,
            specificity: SpecificityTable::from_reach(&DEFAULT_SECTOR_REACH),
        }
    }
}

impl ScoringTables {
    pub fn fuzziness(&self, sectors: SectorSet) -> f64 {
        if sectors.is_general() {
            return self.general_fuzziness;
        }
        self.fuzziness_by_count[sectors.specific_count()]
    }
}

/// All lookup tables the indicator engine reads, keyed by normalized term.
#[derive(Debug, Clone)]
pub struct IndicatorTables {
    instruments: HashMap<String, InstrumentClass>,
    sectors: HashMap<String, SectorClass>,
    pub scoring: ScoringTables,
}

impl Default for IndicatorTables {
    fn default() -> Self {
        Self::from_terms(INSTRUMENT_TERMS, SECTOR_TERMS, ScoringTables::default())
    }
}

impl IndicatorTables {
    pub fn from_terms(
        instruments: &[(&str, InstrumentClass)],
        sectors: &[(&str, SectorClass)],
        scoring: ScoringTables,
    ) -> Self {
        Self {
            instruments: instruments
                .iter()
                .map(|(term, class)| (normalize_token(term), *class))
                .collect(),
            sectors: sectors
                .iter()
                .map(|(term, class)| (normalize_token(term), *class))
                .collect(),
            scoring,
        }
    }

    pub fn instrument(&self, token: &str) -> Option<InstrumentClass> {
        self.instruments.get(&normalize_token(token)).copied()
    }

    pub fn sector(&self, token: &str) -> Option<SectorClass> {
        self.sectors.get(&normalize_token(token)).copied()
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_lookup_is_case_and_space_insensitive() {
        let tables = IndicatorTables::default();
        assert_eq!(
            tables.instrument("  feed-in   TARIFF "),
            Some(I::Instrument(It::FiscalFinancialIncentives))
        );
        assert_eq!(tables.instrument("Economic instruments"), Some(I::Umbrella));
        assert_eq!(tables.instrument("Net metering"), Some(I::Option(Po::BarrierRemoval)));
        assert_eq!(tables.instrument("Carbon sorcery"), None);
    }

    #[test]
    fn test_sector_lookup() {
        let tables = IndicatorTables::default();
        assert_eq!(tables.sector("Electricity"), Some(S::Sector(Sector::Electricity)));
        assert_eq!(tables.sector("general"), Some(S::Sector(Sector::General)));
        assert_eq!(tables.sector("Space"), None);
    }

    #[test]
    fn test_every_category_has_a_term() {
        let tables = IndicatorTables::default();
        for kind in InstrumentType::ALL {
            assert!(tables.instruments.values().any(|c| *c == I::Instrument(kind)), "{kind:?}");
        }
        for kind in PolicyOption::ALL {
            assert!(tables.instruments.values().any(|c| *c == I::Option(kind)), "{kind:?}");
        }
        for sector in Sector::ALL {
            assert!(tables.sectors.values().any(|c| *c == S::Sector(sector)), "{sector:?}");
        }
    }

    #[test]
    fn test_specificity_depends_on_subset() {
        let table = SpecificityTable::from_reach(&DEFAULT_SECTOR_REACH);
        let energy = SectorSet::from_sectors(&[Sector::Electricity, Sector::Industry]);
        let demand = SectorSet::from_sectors(&[Sector::Buildings, Sector::Land]);
        assert_eq!(table.score(energy), 0.5);
        assert_eq!(table.score(demand), 0.7);
        assert_eq!(table.score(SectorSet::from_sectors(&[Sector::Land])), 0.9);
        assert_eq!(table.score(SectorSet::default()), 0.0);
    }

    #[test]
    fn test_all_specific_sectors_score_zero() {
        let table = SpecificityTable::from_reach(&DEFAULT_SECTOR_REACH);
        assert_eq!(table.score(SectorSet::from_sectors(&Sector::SPECIFIC)), 0.0);
    }

    #[test]
    fn test_general_is_maximally_fuzzy() {
        let scoring = ScoringTables::default();
        let general_only = SectorSet::from_sectors(&[Sector::General]);
        let general_and_more = SectorSet::from_sectors(&[Sector::General, Sector::Transport]);
        assert_eq!(scoring.fuzziness(general_only), 1.0);
        assert_eq!(scoring.fuzziness(general_and_more), 1.0);
        assert_eq!(scoring.specificity.score(general_and_more), 0.0);

        let max_specific = scoring.fuzziness(SectorSet::from_sectors(&Sector::SPECIFIC));
        assert!(max_specific < scoring.general_fuzziness);
    }
}
