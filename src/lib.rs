//! Filter, sort and search for the staff list pages of an admission system.
//!
//! A [`page::ListPage`] owns the loaded records of one kind together with its
//! search term, per-column filters and sort directive. The visible list is
//! derived from those four inputs by [`view::derive_rows`]; the per-column
//! [`column::ColumnControl`] turns user actions into filter and sort changes.
//! The `admtable` binary puts a terminal table on top of it.

pub mod column;
pub mod controller;
pub mod domain;
pub mod inputter;
pub mod logging;
pub mod model;
pub mod page;
pub mod record;
pub mod records;
pub mod source;
pub mod ui;
pub mod view;
