// Copyright (c) Node Fuzz Contributors
// SPDX-License-Identifier: Apache-2.0

//! Thin re-export of `failure` that adds the `Result<T>` alias the rest of
//! the workspace is written against. Every other crate depends on this one
//! under the `failure` name (see each `Cargo.toml`'s `package = ...` line),
//! so `use failure::{format_err, Result};` resolves here rather than at the
//! upstream crate, which has no `Result` alias of its own.

pub use failure::{
    bail, ensure, err_msg, format_err, Backtrace, Context, Error, Fail, ResultExt,
};

/// `std::result::Result` pinned to [`Error`], the alias the rest of the
/// workspace writes fallible signatures against.
pub type Result<T> = ::std::result::Result<T, Error>;
