//! The fixed indicator dimensions and their output column names.

use serde::{Deserialize, Serialize};

/// Policy instrument categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstrumentType {
    DirectInvestment,
    FiscalFinancialIncentives,
    MarketBasedInstruments,
    CodesStandards,
    OtherRegulatoryInstruments,
    Rdd,
    InformationEducation,
}

impl InstrumentType {
    pub const ALL: [InstrumentType; 7] = [
        Self::DirectInvestment,
        Self::FiscalFinancialIncentives,
        Self::MarketBasedInstruments,
        Self::CodesStandards,
        Self::OtherRegulatoryInstruments,
        Self::Rdd,
        Self::InformationEducation,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            Self::DirectInvestment => "DirectInvestment",
            Self::FiscalFinancialIncentives => "FiscalFinancialIncentives",
            Self::MarketBasedInstruments => "Market-basedInstruments",
            Self::CodesStandards => "CodesStandards",
            Self::OtherRegulatoryInstruments => "OtherRegulatoryInstruments",
            Self::Rdd => "RDD",
            Self::InformationEducation => "InformationEducation",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Policy-matrix options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PolicyOption {
    PolicySupport,
    VoluntaryApproaches,
    BarrierRemoval,
    ClimateStrategy,
    Target,
}

impl PolicyOption {
    pub const ALL: [PolicyOption; 5] = [
        Self::PolicySupport,
        Self::VoluntaryApproaches,
        Self::BarrierRemoval,
        Self::ClimateStrategy,
        Self::Target,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            Self::PolicySupport => "PolicySupport",
            Self::VoluntaryApproaches => "VoluntaryApproaches",
            Self::BarrierRemoval => "BarrierRemoval",
            Self::ClimateStrategy => "ClimateStrategy",
            Self::Target => "Target",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Sector coverage categories. `General` is the cross-sector marker; the
/// other five are the specific sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sector {
    General,
    Electricity,
    Industry,
    Buildings,
    Transport,
    Land,
}

impl Sector {
    pub const ALL: [Sector; 6] = [
        Self::General,
        Self::Electricity,
        Self::Industry,
        Self::Buildings,
        Self::Transport,
        Self::Land,
    ];

    pub const SPECIFIC: [Sector; 5] = [
        Self::Electricity,
        Self::Industry,
        Self::Buildings,
        Self::Transport,
        Self::Land,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            Self::General => "GeneralSector",
            Self::Electricity => "ElectricitySector",
            Self::Industry => "IndustrySector",
            Self::Buildings => "BuildingsSector",
            Self::Transport => "TransportSector",
            Self::Land => "LandSector",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Flags for the seven instrument categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstrumentFlags([bool; 7]);

impl InstrumentFlags {
    pub fn set(&mut self, kind: InstrumentType) {
        self.0[kind.index()] = true;
    }

    pub fn contains(&self, kind: InstrumentType) -> bool {
        self.0[kind.index()]
    }
}

/// Flags for the five policy options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionFlags([bool; 5]);

impl OptionFlags {
    pub fn set(&mut self, kind: PolicyOption) {
        self.0[kind.index()] = true;
    }

    pub fn contains(&self, kind: PolicyOption) -> bool {
        self.0[kind.index()]
    }
}

/// A set of sectors packed into one byte.
///
/// Bit 0 is `General`; bits 1..=5 are the specific sectors, so
/// [`SectorSet::specific_mask`] indexes a 32-entry subset table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SectorSet(u8);

impl SectorSet {
    pub fn from_sectors(sectors: &[Sector]) -> Self {
        let mut set = Self::default();
        for sector in sectors {
            set.insert(*sector);
        }
        set
    }

    pub fn insert(&mut self, sector: Sector) {
        self.0 |= sector.bit();
    }

    pub fn contains(&self, sector: Sector) -> bool {
        self.0 & sector.bit() != 0
    }

    pub fn is_general(&self) -> bool {
        self.contains(Sector::General)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of specific (non-general) sectors in the set.
    pub fn specific_count(&self) -> usize {
        self.specific_mask().count_ones() as usize
    }

    /// The specific sectors as a 5-bit mask (`0..32`).
    pub fn specific_mask(&self) -> usize {
        (self.0 >> 1) as usize
    }
}
