//! Match and profile storage interface and implementations
//!
//! This module defines the interface for persisting matches and player
//! profiles, with an in-memory implementation and a mock for testing.

use crate::error::Result;
use crate::types::{Match, MatchId, MatchStatus, PlayerProfile, UserId};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for match and profile storage operations
#[async_trait]
pub trait MatchStorage: Send + Sync {
    /// Persist a newly created match
    async fn insert_match(&self, duel: Match) -> Result<()>;

    /// Fetch a match by ID
    async fn fetch_match(&self, match_id: &str) -> Result<Option<Match>>;

    /// Overwrite a stored match
    async fn update_match(&self, duel: Match) -> Result<()>;

    /// List matches where the user is a participant, newest first
    async fn matches_for_user(
        &self,
        user_id: UserId,
        status: Option<MatchStatus>,
        limit: usize,
    ) -> Result<Vec<Match>>;

    /// Fetch a player's profile
    async fn fetch_profile(&self, user_id: UserId) -> Result<Option<PlayerProfile>>;

    /// Insert or overwrite a player's profile
    async fn upsert_profile(&self, profile: PlayerProfile) -> Result<()>;

    /// Flip a player's presence flag; unknown players are ignored
    async fn set_online(&self, user_id: UserId, online: bool) -> Result<()>;

    /// Pick a random online player other than `exclude`
    async fn random_online_opponent(&self, exclude: UserId) -> Result<Option<UserId>>;

    /// Store a completed match and both updated profiles as one unit.
    ///
    /// Either all three records are visible afterwards or none are.
    async fn complete_match(
        &self,
        duel: Match,
        player1: PlayerProfile,
        player2: PlayerProfile,
    ) -> Result<()>;
}

/// In-memory match storage implementation
#[derive(Debug, Default)]
pub struct InMemoryMatchStorage {
    matches: RwLock<HashMap<MatchId, Match>>,
    profiles: RwLock<HashMap<UserId, PlayerProfile>>,
}

impl InMemoryMatchStorage {
    /// Create a new in-memory match storage
    pub fn new() -> Self {
        Self::default()
    }

    fn read_matches(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<MatchId, Match>>> {
        Ok(self
            .matches
            .read()
            .map_err(|_| crate::error::ArenaError::InternalError {
                message: "Failed to acquire matches read lock".to_string(),
            })?)
    }

    fn write_matches(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<MatchId, Match>>> {
        Ok(self
            .matches
            .write()
            .map_err(|_| crate::error::ArenaError::InternalError {
                message: "Failed to acquire matches write lock".to_string(),
            })?)
    }

    fn read_profiles(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<UserId, PlayerProfile>>> {
        Ok(self
            .profiles
            .read()
            .map_err(|_| crate::error::ArenaError::InternalError {
                message: "Failed to acquire profiles read lock".to_string(),
            })?)
    }

    fn write_profiles(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<UserId, PlayerProfile>>> {
        Ok(self
            .profiles
            .write()
            .map_err(|_| crate::error::ArenaError::InternalError {
                message: "Failed to acquire profiles write lock".to_string(),
            })?)
    }
}

#[async_trait]
impl MatchStorage for InMemoryMatchStorage {
    async fn insert_match(&self, duel: Match) -> Result<()> {
        let mut matches = self.write_matches()?;
        matches.insert(duel.match_id.clone(), duel);
        Ok(())
    }

    async fn fetch_match(&self, match_id: &str) -> Result<Option<Match>> {
        let matches = self.read_matches()?;
        Ok(matches.get(match_id).cloned())
    }

    async fn update_match(&self, duel: Match) -> Result<()> {
        let mut matches = self.write_matches()?;
        matches.insert(duel.match_id.clone(), duel);
        Ok(())
    }

    async fn matches_for_user(
        &self,
        user_id: UserId,
        status: Option<MatchStatus>,
        limit: usize,
    ) -> Result<Vec<Match>> {
        let matches = self.read_matches()?;

        let mut result: Vec<Match> = matches
            .values()
            .filter(|duel| duel.is_participant(user_id))
            .filter(|duel| status.map_or(true, |s| duel.status == s))
            .cloned()
            .collect();

        // Newest first
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result.truncate(limit);

        Ok(result)
    }

    async fn fetch_profile(&self, user_id: UserId) -> Result<Option<PlayerProfile>> {
        let profiles = self.read_profiles()?;
        Ok(profiles.get(&user_id).cloned())
    }

    async fn upsert_profile(&self, profile: PlayerProfile) -> Result<()> {
        let mut profiles = self.write_profiles()?;
        profiles.insert(profile.user_id, profile);
        Ok(())
    }

    async fn set_online(&self, user_id: UserId, online: bool) -> Result<()> {
        let mut profiles = self.write_profiles()?;
        if let Some(profile) = profiles.get_mut(&user_id) {
            profile.is_online = online;
            profile.updated_at = crate::utils::current_timestamp();
        }
        Ok(())
    }

    async fn random_online_opponent(&self, exclude: UserId) -> Result<Option<UserId>> {
        let profiles = self.read_profiles()?;

        let candidates: Vec<UserId> = profiles
            .values()
            .filter(|profile| profile.is_online && profile.user_id != exclude)
            .map(|profile| profile.user_id)
            .collect();

        Ok(candidates.choose(&mut rand::thread_rng()).copied())
    }

    async fn complete_match(
        &self,
        duel: Match,
        player1: PlayerProfile,
        player2: PlayerProfile,
    ) -> Result<()> {
        // Hold both write locks so the records land together
        let mut matches = self.write_matches()?;
        let mut profiles = self.write_profiles()?;

        matches.insert(duel.match_id.clone(), duel);
        profiles.insert(player1.user_id, player1);
        profiles.insert(player2.user_id, player2);

        Ok(())
    }
}

/// Mock match storage for testing
#[derive(Debug, Default)]
pub struct MockMatchStorage {
    inner: InMemoryMatchStorage,
    complete_calls: RwLock<Vec<MatchId>>,
    fail_complete: std::sync::atomic::AtomicBool,
}

impl MockMatchStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset a profile for testing
    pub async fn preset_profile(&self, profile: PlayerProfile) {
        let _ = self.inner.upsert_profile(profile).await;
    }

    /// Preset a match for testing
    pub async fn preset_match(&self, duel: Match) {
        let _ = self.inner.insert_match(duel).await;
    }

    /// Make subsequent complete_match calls fail
    pub fn set_fail_complete(&self, fail: bool) {
        self.fail_complete
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Get all complete_match calls made (for testing)
    pub fn get_complete_calls(&self) -> Vec<MatchId> {
        self.complete_calls
            .read()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Clear recorded calls
    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.complete_calls.write() {
            calls.clear();
        }
    }
}

#[async_trait]
impl MatchStorage for MockMatchStorage {
    async fn insert_match(&self, duel: Match) -> Result<()> {
        self.inner.insert_match(duel).await
    }

    async fn fetch_match(&self, match_id: &str) -> Result<Option<Match>> {
        self.inner.fetch_match(match_id).await
    }

    async fn update_match(&self, duel: Match) -> Result<()> {
        self.inner.update_match(duel).await
    }

    async fn matches_for_user(
        &self,
        user_id: UserId,
        status: Option<MatchStatus>,
        limit: usize,
    ) -> Result<Vec<Match>> {
        self.inner.matches_for_user(user_id, status, limit).await
    }

    async fn fetch_profile(&self, user_id: UserId) -> Result<Option<PlayerProfile>> {
        self.inner.fetch_profile(user_id).await
    }

    async fn upsert_profile(&self, profile: PlayerProfile) -> Result<()> {
        self.inner.upsert_profile(profile).await
    }

    async fn set_online(&self, user_id: UserId, online: bool) -> Result<()> {
        self.inner.set_online(user_id, online).await
    }

    async fn random_online_opponent(&self, exclude: UserId) -> Result<Option<UserId>> {
        self.inner.random_online_opponent(exclude).await
    }

    async fn complete_match(
        &self,
        duel: Match,
        player1: PlayerProfile,
        player2: PlayerProfile,
    ) -> Result<()> {
        // Record the call
        if let Ok(mut calls) = self.complete_calls.write() {
            calls.push(duel.match_id.clone());
        }

        if self.fail_complete.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(crate::error::ArenaError::StorageError {
                message: "Injected completion failure".to_string(),
            }
            .into());
        }

        self.inner.complete_match(duel, player1, player2).await
    }
}
