// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Tests for the EST enrollment operations.

mod reenroll_test;
