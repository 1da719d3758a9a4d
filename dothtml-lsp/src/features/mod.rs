pub mod completion;
pub mod diagnostics;
pub mod hover;
pub mod selection_range;
