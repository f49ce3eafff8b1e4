pub mod materiality;
pub mod rule_tables;
pub mod rules;
pub mod trend;
pub mod validation;
pub mod weighted;
