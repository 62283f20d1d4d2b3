//! Type-state markers for the config builder
//!
//! These types track at compile time whether the required host has been
//! set, so `build()` only exists on a builder that has one.

use std::marker::PhantomData;

/// Marker trait for host state
pub trait HostState {}

/// Host has not been set
pub struct NoHost;
impl HostState for NoHost {}

/// Host has been set
pub struct HasHost;
impl HostState for HasHost {}

/// Phantom marker to prevent direct construction
#[derive(Debug, Clone, Copy)]
pub struct TypeState<H> {
    _host: PhantomData<H>,
}

impl<H> TypeState<H> {
    pub(crate) fn new() -> Self {
        Self { _host: PhantomData }
    }
}

impl<H> Default for TypeState<H> {
    fn default() -> Self {
        Self::new()
    }
}
