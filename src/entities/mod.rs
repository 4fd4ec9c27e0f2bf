// Entity Models
//
// Each entity module owns its record type, its request input types and the
// repository functions that read and write its table.

pub mod distributor;
pub mod scheme;
pub mod split;

pub use distributor::{Distributor, DistributorInput, UpsertOutcome};
pub use scheme::{GstMode, NewScheme, PayoutMode, RateField, RateMap, Scheme, SchemeUpdate};
pub use split::{CommissionSplit, SplitInput};
