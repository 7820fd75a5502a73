#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_debug_implementations, missing_docs, rust_2018_idioms)]
#![deny(unreachable_pub)]

//! sk-portal-core

pub mod code;
pub mod common;
pub mod countdown;
pub mod email;
pub mod error;
pub mod session;
pub mod throttle;
