pub mod expressions;
pub mod terms;
