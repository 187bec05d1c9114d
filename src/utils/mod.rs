pub mod feature_flags;
pub mod naming;
pub mod suggest;
