pub mod company;
pub mod materiality;
pub mod metric;
pub mod score;
pub mod trend;
