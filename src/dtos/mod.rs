pub mod affiliatedtos;
pub mod trackingdtos;
