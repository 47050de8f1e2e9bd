// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Random operation sequences against one controller, checking that the
//! resource tree and the service graph never drift apart.

mod model_service_consistency;
