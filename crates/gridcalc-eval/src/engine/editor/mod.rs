pub mod reference_adjuster;

pub use reference_adjuster::{
    AbsoluteMode, ReferenceAdjuster, cycle_absolute, cycle_reference, cycle_reference_at,
    translate_formula,
};
