//! Run via `cargo test -p sk-portal-cli --test integration`

mod api;
