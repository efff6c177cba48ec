use crate::error::{RoomError, RoomResult};
use crate::state::auth::validate_username;
use crate::types::*;

impl Room {
    /// Append a new open poll. Host-gated.
    pub fn add_question(
        &mut self,
        username: &str,
        question: &str,
        options: Vec<String>,
    ) -> RoomResult<Poll> {
        if !self.authorize(username) {
            return Err(RoomError::Permission("add questions".into()));
        }
        let question = question.trim();
        if question.is_empty() {
            return Err(RoomError::Validation("question must not be empty".into()));
        }
        if options.len() < 2 {
            return Err(RoomError::Validation(
                "a poll needs at least 2 options".into(),
            ));
        }
        for (i, option) in options.iter().enumerate() {
            if option.trim().is_empty() {
                return Err(RoomError::Validation("options must not be empty".into()));
            }
            if options[..i].contains(option) {
                return Err(RoomError::Validation(format!("duplicate option: {option}")));
            }
        }

        let poll = Poll {
            id: ulid::Ulid::new().to_string(),
            question: question.to_string(),
            options,
            votes: Vec::new(),
            winning_index: None,
            completed_at: None,
        };
        self.polls.push(poll.clone());
        Ok(poll)
    }

    /// Record a ballot on an open poll, replacing the same username's
    /// earlier vote in place — at most one vote per user per poll.
    pub fn submit_vote(&mut self, poll_id: &str, mut vote: Vote) -> RoomResult<()> {
        vote.username = validate_username(&vote.username)?;

        let poll = self
            .polls
            .iter_mut()
            .find(|p| p.id == poll_id)
            .ok_or_else(|| RoomError::NotFound(format!("poll {poll_id}")))?;
        if poll.is_complete() {
            return Err(RoomError::PollClosed(poll.id.clone()));
        }
        if vote.vote_index >= poll.options.len() {
            return Err(RoomError::Validation("vote index out of range".into()));
        }
        if vote.guess_index >= poll.options.len() {
            return Err(RoomError::Validation("guess index out of range".into()));
        }

        match poll.votes.iter().position(|v| v.username == vote.username) {
            Some(i) => poll.votes[i] = vote,
            None => poll.votes.push(vote),
        }
        Ok(())
    }

    /// Complete a poll exactly once and fold its votes into durable scores:
    /// every voter's `polls_participated` goes up by one, and a correct
    /// guess earns [`GUESS_REWARD`] points. Ends with an archival check.
    ///
    /// Every check precedes any mutation — a rejected completion leaves the
    /// room untouched.
    pub fn complete_poll(
        &mut self,
        username: &str,
        poll_id: &str,
        winning_index: usize,
    ) -> RoomResult<()> {
        if !self.authorize(username) {
            return Err(RoomError::Permission("complete polls".into()));
        }
        let position = self
            .polls
            .iter()
            .position(|p| p.id == poll_id)
            .ok_or_else(|| RoomError::NotFound(format!("poll {poll_id}")))?;
        if self.polls[position].is_complete() {
            return Err(RoomError::AlreadyComplete(poll_id.to_string()));
        }
        if winning_index >= self.polls[position].options.len() {
            return Err(RoomError::Validation("winning index out of range".into()));
        }

        self.polls[position].winning_index = Some(winning_index);
        self.polls[position].completed_at = Some(chrono::Utc::now().to_rfc3339());

        let votes = self.polls[position].votes.clone();
        for vote in &votes {
            let idx = match self.scores.iter().position(|s| s.username == vote.username) {
                Some(idx) => idx,
                None => {
                    self.scores.push(ScoreRecord {
                        username: vote.username.clone(),
                        total: 0,
                        polls_participated: 0,
                    });
                    self.scores.len() - 1
                }
            };
            let record = &mut self.scores[idx];
            record.polls_participated += 1;
            if vote.guess_index == winning_index {
                record.total += GUESS_REWARD;
            }
        }

        self.archive_if_needed();
        Ok(())
    }

    /// Compact the recent-history window once it overflows: keep the newest
    /// [`ARCHIVE_KEEP`] polls and fold the drained prefix into the archive
    /// counters. Scores are never recomputed from archived detail — this is
    /// compaction of detail, not of scores. Returns how many polls moved.
    pub fn archive_if_needed(&mut self) -> usize {
        if self.polls.len() <= ARCHIVE_TRIGGER {
            return 0;
        }
        let drained = self.polls.len() - ARCHIVE_KEEP;
        for poll in self.polls.drain(..drained) {
            self.archive.polls += 1;
            self.archive.votes += poll.votes.len() as u64;
        }
        tracing::info!(drained, retained = ARCHIVE_KEEP, "archived poll history");
        drained
    }

    /// Leaderboard, descending by total. The sort is stable and `scores`
    /// keeps first-appearance order, so ties break deterministically.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .scores
            .iter()
            .map(|s| LeaderboardEntry {
                username: s.username.clone(),
                total: s.total,
                polls_participated: s.polls_participated,
                average: s.total as f64 / s.polls_participated.max(1) as f64,
            })
            .collect();
        entries.sort_by(|a, b| b.total.cmp(&a.total));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_with_host() -> Room {
        let mut room = Room::new();
        room.register_connection("c1", "Alice");
        room.claim_host("Alice", "c1").unwrap();
        room
    }

    fn vote(username: &str, vote_index: usize, guess_index: usize) -> Vote {
        Vote {
            username: username.to_string(),
            vote_index,
            guess_index,
        }
    }

    #[test]
    fn test_add_question() {
        let mut room = room_with_host();
        let poll = room
            .add_question("Alice", "Rain?", vec!["Yes".into(), "No".into()])
            .unwrap();

        assert_eq!(room.polls.len(), 1);
        assert_eq!(poll.question, "Rain?");
        assert!(!poll.is_complete());
        assert!(room.poll(&poll.id).is_some());
    }

    #[test]
    fn test_add_question_requires_host() {
        let mut room = room_with_host();
        let err = room
            .add_question("Bob", "Rain?", vec!["Yes".into(), "No".into()])
            .unwrap_err();
        assert!(matches!(err, RoomError::Permission(_)));
        assert!(room.polls.is_empty());
    }

    #[test]
    fn test_add_question_validation() {
        let mut room = room_with_host();

        let err = room
            .add_question("Alice", "  ", vec!["Yes".into(), "No".into()])
            .unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));

        let err = room
            .add_question("Alice", "Rain?", vec!["Yes".into()])
            .unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));

        let err = room
            .add_question("Alice", "Rain?", vec!["Yes".into(), "Yes".into()])
            .unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));

        let err = room
            .add_question("Alice", "Rain?", vec!["Yes".into(), " ".into()])
            .unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));

        assert!(room.polls.is_empty());
    }

    #[test]
    fn test_submit_vote_unknown_poll() {
        let mut room = room_with_host();
        let err = room.submit_vote("nope", vote("Bob", 0, 0)).unwrap_err();
        assert!(matches!(err, RoomError::NotFound(_)));
    }

    #[test]
    fn test_submit_vote_range_checks() {
        let mut room = room_with_host();
        let poll = room
            .add_question("Alice", "Rain?", vec!["Yes".into(), "No".into()])
            .unwrap();

        let err = room.submit_vote(&poll.id, vote("Bob", 2, 0)).unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));
        let err = room.submit_vote(&poll.id, vote("Bob", 0, 2)).unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));
        assert!(room.poll(&poll.id).unwrap().votes.is_empty());
    }

    #[test]
    fn test_last_vote_wins() {
        let mut room = room_with_host();
        let poll = room
            .add_question("Alice", "Rain?", vec!["Yes".into(), "No".into()])
            .unwrap();

        room.submit_vote(&poll.id, vote("Bob", 0, 0)).unwrap();
        room.submit_vote(&poll.id, vote("Bob", 1, 1)).unwrap();
        room.submit_vote(&poll.id, vote("Carol", 0, 1)).unwrap();

        let poll = room.poll(&poll.id).unwrap();
        assert_eq!(poll.votes.len(), 2);
        assert_eq!(poll.vote_of("Bob"), Some(&vote("Bob", 1, 1)));
    }

    #[test]
    fn test_vote_on_complete_poll_rejected() {
        let mut room = room_with_host();
        let poll = room
            .add_question("Alice", "Rain?", vec!["Yes".into(), "No".into()])
            .unwrap();
        room.complete_poll("Alice", &poll.id, 0).unwrap();

        let err = room.submit_vote(&poll.id, vote("Bob", 0, 0)).unwrap_err();
        assert_eq!(err, RoomError::PollClosed(poll.id.clone()));
    }

    #[test]
    fn test_complete_poll_scores_correct_guesses() {
        let mut room = room_with_host();
        let poll = room
            .add_question("Alice", "Rain?", vec!["Yes".into(), "No".into()])
            .unwrap();

        // Bob guesses the winner, Carol does not
        room.submit_vote(&poll.id, vote("Bob", 0, 1)).unwrap();
        room.submit_vote(&poll.id, vote("Carol", 1, 0)).unwrap();
        room.complete_poll("Alice", &poll.id, 1).unwrap();

        assert_eq!(
            room.score_of("Bob"),
            Some(&ScoreRecord {
                username: "Bob".into(),
                total: GUESS_REWARD,
                polls_participated: 1,
            })
        );
        assert_eq!(
            room.score_of("Carol"),
            Some(&ScoreRecord {
                username: "Carol".into(),
                total: 0,
                polls_participated: 1,
            })
        );
        assert!(room.poll(&poll.id).unwrap().is_complete());
        assert!(room.poll(&poll.id).unwrap().completed_at.is_some());
    }

    #[test]
    fn test_complete_poll_requires_host() {
        let mut room = room_with_host();
        let poll = room
            .add_question("Alice", "Rain?", vec!["Yes".into(), "No".into()])
            .unwrap();

        let err = room.complete_poll("Bob", &poll.id, 0).unwrap_err();
        assert!(matches!(err, RoomError::Permission(_)));
        assert!(!room.poll(&poll.id).unwrap().is_complete());
    }

    #[test]
    fn test_complete_poll_idempotency_guard() {
        let mut room = room_with_host();
        let poll = room
            .add_question("Alice", "Rain?", vec!["Yes".into(), "No".into()])
            .unwrap();
        room.submit_vote(&poll.id, vote("Bob", 0, 0)).unwrap();

        room.complete_poll("Alice", &poll.id, 0).unwrap();
        let err = room.complete_poll("Alice", &poll.id, 0).unwrap_err();
        assert_eq!(err, RoomError::AlreadyComplete(poll.id.clone()));

        // Scores were applied exactly once
        assert_eq!(room.score_of("Bob").unwrap().total, GUESS_REWARD);
        assert_eq!(room.score_of("Bob").unwrap().polls_participated, 1);
    }

    #[test]
    fn test_complete_poll_invalid_winner_leaves_state_unchanged() {
        let mut room = room_with_host();
        let poll = room
            .add_question("Alice", "Rain?", vec!["Yes".into(), "No".into()])
            .unwrap();
        room.submit_vote(&poll.id, vote("Bob", 0, 0)).unwrap();

        let err = room.complete_poll("Alice", &poll.id, 2).unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));
        assert!(!room.poll(&poll.id).unwrap().is_complete());
        assert!(room.scores.is_empty());
    }

    #[test]
    fn test_score_delta_is_reward_times_correct_guesses() {
        let mut room = room_with_host();
        let poll = room
            .add_question("Alice", "Pick", vec!["A".into(), "B".into(), "C".into()])
            .unwrap();

        for (name, guess) in [("Bob", 1), ("Carol", 1), ("Dave", 2), ("Erin", 0)] {
            room.submit_vote(&poll.id, vote(name, 0, guess)).unwrap();
        }
        let before: u64 = room.scores.iter().map(|s| s.total).sum();
        room.complete_poll("Alice", &poll.id, 1).unwrap();
        let after: u64 = room.scores.iter().map(|s| s.total).sum();

        let correct = room
            .poll(&poll.id)
            .unwrap()
            .votes
            .iter()
            .filter(|v| v.guess_index == 1)
            .count() as u64;
        assert_eq!(after - before, GUESS_REWARD * correct);
        assert_eq!(after - before, 20);
    }

    #[test]
    fn test_scores_accumulate_across_polls() {
        let mut room = room_with_host();
        for _ in 0..3 {
            let poll = room
                .add_question("Alice", "Rain?", vec!["Yes".into(), "No".into()])
                .unwrap();
            room.submit_vote(&poll.id, vote("Bob", 0, 0)).unwrap();
            room.complete_poll("Alice", &poll.id, 0).unwrap();
        }

        let bob = room.score_of("Bob").unwrap();
        assert_eq!(bob.total, 3 * GUESS_REWARD);
        assert_eq!(bob.polls_participated, 3);
    }

    #[test]
    fn test_archive_compacts_window_and_keeps_scores() {
        let mut room = room_with_host();
        for i in 0..ARCHIVE_TRIGGER + 1 {
            let poll = room
                .add_question("Alice", &format!("Q{i}"), vec!["Yes".into(), "No".into()])
                .unwrap();
            room.submit_vote(&poll.id, vote("Bob", 0, 0)).unwrap();
            room.complete_poll("Alice", &poll.id, 0).unwrap();
        }

        // 26th completion tipped the window over the trigger
        assert_eq!(room.polls.len(), ARCHIVE_KEEP);
        assert_eq!(room.archive.polls, (ARCHIVE_TRIGGER + 1 - ARCHIVE_KEEP) as u64);
        assert_eq!(room.archive.votes, room.archive.polls);

        // The retained suffix is the most recent polls
        assert_eq!(room.polls[0].question, "Q6");
        assert_eq!(room.polls[ARCHIVE_KEEP - 1].question, "Q25");

        // Archival never rewrites scores
        let bob = room.score_of("Bob").unwrap();
        assert_eq!(bob.total, 26 * GUESS_REWARD);
        assert_eq!(bob.polls_participated, 26);
    }

    #[test]
    fn test_archive_noop_below_trigger() {
        let mut room = room_with_host();
        for i in 0..ARCHIVE_TRIGGER {
            room.add_question("Alice", &format!("Q{i}"), vec!["Yes".into(), "No".into()])
                .unwrap();
        }
        assert_eq!(room.archive_if_needed(), 0);
        assert_eq!(room.polls.len(), ARCHIVE_TRIGGER);
        assert_eq!(room.archive, ArchiveStats::default());
    }

    #[test]
    fn test_leaderboard_order_and_average() {
        let mut room = room_with_host();

        // Two polls where Bob and Carol guess right, Dave never does
        for _ in 0..2 {
            let poll = room
                .add_question("Alice", "Q", vec!["A".into(), "B".into()])
                .unwrap();
            room.submit_vote(&poll.id, vote("Bob", 0, 0)).unwrap();
            room.submit_vote(&poll.id, vote("Carol", 0, 0)).unwrap();
            room.submit_vote(&poll.id, vote("Dave", 0, 1)).unwrap();
            room.complete_poll("Alice", &poll.id, 0).unwrap();
        }
        // A third poll Carol gets wrong, dragging her average below Bob's
        let poll = room
            .add_question("Alice", "Q", vec!["A".into(), "B".into()])
            .unwrap();
        room.submit_vote(&poll.id, vote("Carol", 0, 1)).unwrap();
        room.complete_poll("Alice", &poll.id, 0).unwrap();

        let board = room.leaderboard();
        assert_eq!(board[0].username, "Bob");
        assert_eq!(board[0].total, 20);
        assert_eq!(board[0].average, 10.0);
        assert_eq!(board[1].username, "Carol");
        assert_eq!(board[1].total, 20);
        assert_eq!(board[1].polls_participated, 3);
        assert!((board[1].average - 20.0 / 3.0).abs() < 1e-9);
        assert_eq!(board[2].username, "Dave");
        assert_eq!(board[2].total, 0);
    }

    #[test]
    fn test_leaderboard_tie_break_is_first_appearance() {
        let mut room = room_with_host();
        let poll = room
            .add_question("Alice", "Q", vec!["A".into(), "B".into()])
            .unwrap();
        // Zed appears first in the votes, so ties break in Zed's favor
        room.submit_vote(&poll.id, vote("Zed", 0, 0)).unwrap();
        room.submit_vote(&poll.id, vote("Amy", 0, 0)).unwrap();
        room.complete_poll("Alice", &poll.id, 0).unwrap();

        let board = room.leaderboard();
        assert_eq!(board[0].total, board[1].total);
        assert_eq!(board[0].username, "Zed");
        assert_eq!(board[1].username, "Amy");
    }

    #[test]
    fn test_leaderboard_average_with_zero_participation() {
        let room = Room::new();
        assert!(room.leaderboard().is_empty());
    }
}
