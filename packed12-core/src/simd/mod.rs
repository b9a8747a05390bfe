// packed12
// Copyright (c) 2021 The packed12 Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vector kernels, one module per ISA (spec.md §4.6). Each submodule is compiled only on the
//! architecture it targets and exposes the same three un-dispatched entry points
//! (`decode`, `encode`, `encode_log_inplace`) as [`crate::scalar`]/[`crate::log_enc`]; selecting
//! among them at run time is [`crate::dispatch`]'s job, not this module's.

#[cfg(target_arch = "x86_64")]
pub mod sse41;

#[cfg(target_arch = "x86_64")]
pub mod avx2;

#[cfg(target_arch = "aarch64")]
pub mod neon;
