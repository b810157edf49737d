pub mod reference;
pub mod resample;
pub mod track;
pub mod video;
