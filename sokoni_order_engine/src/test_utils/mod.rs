//! Support for integration tests and local tooling: throwaway databases,
//! migrations, and common fixture data.
pub mod prepare_env;
pub mod seed;
