//! Indicator derivation engine.
//!
//! Turns the free-text instrument and sector fields of a policy into the
//! fixed indicator schema: instrument booleans, policy-option booleans,
//! sector booleans, a fuzziness score and a sector specificity score.
//!
//! Every derivation is total. An absent or unparseable cell yields all-false
//! flags and zero scores; tokens missing from the lookup tables are ignored
//! for flag-setting and counted in an [`IndicatorAudit`].
//!
//! Sector derivation must run before the two scores, which read the sector
//! flags. [`IndicatorEngine::derive_record`] applies the derivations in that
//! order.

mod categories;
mod tables;

pub use categories::{InstrumentFlags, InstrumentType, OptionFlags, PolicyOption, Sector, SectorSet};
pub use tables::{
    DEFAULT_FUZZINESS_BY_COUNT, DEFAULT_GENERAL_FUZZINESS, DEFAULT_SECTOR_REACH, IndicatorTables,
    InstrumentClass, ScoringTables, SectorClass, SpecificityTable,
};

use crate::columns;
use crate::error::Result;
use crate::utils::{split_tokens, string_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Delimiters between values of a multi-valued indicator field.
const FIELD_DELIMITERS: [char; 2] = [',', ';'];

/// Indicator values derived for one policy record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PolicyIndicators {
    pub instruments: InstrumentFlags,
    pub options: OptionFlags,
    pub sectors: SectorSet,
    pub fuzziness: f64,
    pub sector_specificity: f64,
}

/// Tokens the lookup tables did not recognize, with occurrence counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorAudit {
    pub unmapped_instrument_tokens: BTreeMap<String, usize>,
    pub unmapped_sector_tokens: BTreeMap<String, usize>,
}

impl IndicatorAudit {
    pub fn is_clean(&self) -> bool {
        self.unmapped_instrument_tokens.is_empty() && self.unmapped_sector_tokens.is_empty()
    }

    fn record_instrument(&mut self, token: &str) {
        *self
            .unmapped_instrument_tokens
            .entry(token.to_string())
            .or_insert(0) += 1;
    }

    fn record_sector(&mut self, token: &str) {
        *self.unmapped_sector_tokens.entry(token.to_string()).or_insert(0) += 1;
    }
}

/// Derives indicator columns from the lookup tables it borrows.
pub struct IndicatorEngine<'a> {
    tables: &'a IndicatorTables,
}

impl<'a> IndicatorEngine<'a> {
    pub fn new(tables: &'a IndicatorTables) -> Self {
        Self { tables }
    }

    /// Set the instrument flags named by the instrument field.
    pub fn derive_instrument_indicators(
        &self,
        mut record: PolicyIndicators,
        instrument_cell: Option<&str>,
        audit: &mut IndicatorAudit,
    ) -> PolicyIndicators {
        record.instruments = InstrumentFlags::default();
        for token in tokens(instrument_cell) {
            match self.tables.instrument(token) {
                Some(InstrumentClass::Instrument(kind)) => record.instruments.set(kind),
                Some(_) => {}
                None => audit.record_instrument(token),
            }
        }
        record
    }

    /// Set the policy-option flags named by the instrument field.
    ///
    /// Unknown tokens are audited by [`Self::derive_instrument_indicators`],
    /// which reads the same field.
    pub fn derive_policy_options(
        &self,
        mut record: PolicyIndicators,
        instrument_cell: Option<&str>,
    ) -> PolicyIndicators {
        record.options = OptionFlags::default();
        for token in tokens(instrument_cell) {
            if let Some(InstrumentClass::Option(kind)) = self.tables.instrument(token) {
                record.options.set(kind);
            }
        }
        record
    }

    /// Set the sector flags named by the sector field.
    pub fn derive_sector_indicators(
        &self,
        mut record: PolicyIndicators,
        sector_cell: Option<&str>,
        audit: &mut IndicatorAudit,
    ) -> PolicyIndicators {
        record.sectors = SectorSet::default();
        for token in tokens(sector_cell) {
            match self.tables.sector(token) {
                Some(SectorClass::Sector(sector)) => record.sectors.insert(sector),
                Some(SectorClass::Umbrella) => {}
                None => audit.record_sector(token),
            }
        }
        record
    }

    /// Generality score from the sector flags. `GeneralSector` dominates.
    pub fn derive_fuzziness(&self, mut record: PolicyIndicators) -> PolicyIndicators {
        record.fuzziness = self.tables.scoring.fuzziness(record.sectors);
        record
    }

    /// Subset-sensitive specificity score from the sector flags.
    pub fn derive_specificity(&self, mut record: PolicyIndicators) -> PolicyIndicators {
        record.sector_specificity = self.tables.scoring.specificity.score(record.sectors);
        record
    }

    /// Run every derivation for one record, sectors before scores.
    pub fn derive_record(
        &self,
        instrument_cell: Option<&str>,
        sector_cell: Option<&str>,
        audit: &mut IndicatorAudit,
    ) -> PolicyIndicators {
        let record = PolicyIndicators::default();
        let record = self.derive_instrument_indicators(record, instrument_cell, audit);
        let record = self.derive_policy_options(record, instrument_cell);
        let record = self.derive_sector_indicators(record, sector_cell, audit);
        let record = self.derive_fuzziness(record);
        self.derive_specificity(record)
    }

    /// Append all indicator columns to `df`.
    ///
    /// The flags are finalized as strict Boolean columns once every record
    /// has been derived.
    pub fn apply(&self, mut df: DataFrame) -> Result<(DataFrame, IndicatorAudit)> {
        info!("Deriving indicator columns for {} policies...", df.height());

        let instrument_cells = string_values(&df, columns::INSTRUMENT_TYPE)?;
        let sector_cells = string_values(&df, columns::SECTOR_NAME)?;

        let mut audit = IndicatorAudit::default();
        let records: Vec<PolicyIndicators> = instrument_cells
            .iter()
            .zip(&sector_cells)
            .map(|(instrument, sector)| {
                self.derive_record(instrument.as_deref(), sector.as_deref(), &mut audit)
            })
            .collect();

        for kind in InstrumentType::ALL {
            let values: Vec<bool> = records.iter().map(|r| r.instruments.contains(kind)).collect();
            df.with_column(Series::new(kind.column_name().into(), values))?;
        }
        for kind in PolicyOption::ALL {
            let values: Vec<bool> = records.iter().map(|r| r.options.contains(kind)).collect();
            df.with_column(Series::new(kind.column_name().into(), values))?;
        }
        for sector in Sector::ALL {
            let values: Vec<bool> = records.iter().map(|r| r.sectors.contains(sector)).collect();
            df.with_column(Series::new(sector.column_name().into(), values))?;
        }

        let fuzziness: Vec<f64> = records.iter().map(|r| r.fuzziness).collect();
        df.with_column(Series::new(columns::FUZZINESS.into(), fuzziness))?;
        let specificity: Vec<f64> = records.iter().map(|r| r.sector_specificity).collect();
        df.with_column(Series::new(columns::SECTOR_SPECIFICITY.into(), specificity))?;

        if audit.is_clean() {
            debug!("All instrument and sector tokens mapped");
        } else {
            warn!(
                "Unmapped tokens left indicators unset: {} instrument term(s), {} sector term(s)",
                audit.unmapped_instrument_tokens.len(),
                audit.unmapped_sector_tokens.len()
            );
            for (token, count) in &audit.unmapped_instrument_tokens {
                debug!("  unmapped instrument '{}' x{}", token, count);
            }
            for (token, count) in &audit.unmapped_sector_tokens {
                debug!("  unmapped sector '{}' x{}", token, count);
            }
        }

        Ok((df, audit))
    }
}

/// Non-empty trimmed tokens of a multi-valued cell.
fn tokens(cell: Option<&str>) -> impl Iterator<Item = &str> {
    cell.into_iter()
        .flat_map(|c| split_tokens(c, &FIELD_DELIMITERS))
        .filter(|t| !t.is_empty())
}
