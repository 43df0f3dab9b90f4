//! User-defined quantities.
//!
//! The UDQ engine turns DEFINE expressions into per-well, per-group or
//! field values re-evaluated against live summary data every report
//! step. See [`config::UdqConfig`] for the entry point.

pub mod ast;
pub mod config;
pub mod functions;
pub mod set;

pub use ast::{UdqBinaryOp, UdqContext, UdqExpr};
pub use config::{UdqAssign, UdqConfig, UdqDefine, UdqInput};
pub use set::{UdqScalar, UdqSet, UdqVarType};
