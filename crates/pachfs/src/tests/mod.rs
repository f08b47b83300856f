// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

mod adapter;

use crate::adapter::RepoAdapter;
use crate::location::RepoLocation;
use crate::memory::MemoryRepository;
use std::sync::Arc;

pub(crate) fn test_location() -> RepoLocation {
    RepoLocation::new("default", "test", "master").unwrap()
}

/// An adapter over a fresh in-memory branch `default/test@master`.
pub(crate) async fn new_fs() -> (MemoryRepository, RepoAdapter) {
    let repo = MemoryRepository::new();
    let location = test_location();
    repo.create_branch(&location).await;
    let client = Arc::new(repo.client(location.clone()));
    (repo, RepoAdapter::new(location, client))
}
