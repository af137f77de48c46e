// Library root
// -----------
// This crate exposes a small library surface for the `goupc` binary.
// `main.rs` parses the command line and hands off to these modules.
//
// Module responsibilities:
// - `api`: HTTP lookups against the Go-UPC API, the error taxonomy and the
//   sequential batch helper.
// - `product`: normalization of raw API responses into `NormalizedProduct`.
// - `config`: the file-backed store holding the API key.
// - `ui`: terminal rendering for every command.
pub mod api;
pub mod config;
pub mod product;
pub mod ui;
