pub mod config;
pub mod costing;
pub mod domain;
pub mod errors;
pub mod lifecycle;
pub mod mapping;
pub mod naming;
pub mod propagation;
pub mod transfer;

pub use costing::{recalc_totals, validate_boq, validate_costing_note, CostSource, MarginSync};
pub use domain::boq::{Boq, BoqCategory, BoqId, BoqTotals, FlatRow, HeaderMargins, MarginRow};
pub use domain::costing_note::{CostingNote, CostingNoteId, CostingNoteItem, CostingNoteTotals};
pub use domain::item::{GroupBounds, Item, ItemCode, ItemFlags, ItemGroup, ItemType};
pub use domain::opportunity::{Opportunity, OpportunityId, OpportunityItem, Quotation};
pub use domain::stock::{PickList, StockEntry, WorkOrder};
pub use domain::RowId;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use lifecycle::{DocStatus, DocumentEvent};
pub use naming::{plan_item_code, CodePlan, NamingAttributes, NamingRequest, SeriesPattern};
pub use propagation::PropagationOutcome;
