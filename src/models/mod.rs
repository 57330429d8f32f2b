mod alert;
mod price_record;
mod reading;

pub use alert::{AlertOutcome, AlertRecipient, Channel, CycleOutcome};
pub use price_record::PriceRecord;
pub use reading::Reading;
