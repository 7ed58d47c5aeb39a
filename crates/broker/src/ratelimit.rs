// Copyright 2025 arbiter contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use arbiter_api::RateLimitInfo;

const WINDOW_SECS: i64 = 3600;

pub struct RateLimitDecision {
    pub allowed: bool,
    pub info:    RateLimitInfo,
}

/// spec.md section 4.5 "Throttling" / section 8 scenario 9: at most
/// `max_per_hour` submissions per `(user, course, problem)` in a rolling
/// 1-hour window. `recent_timestamps` must already be filtered to that
/// tuple and to `now - 3600 ..= now`.
#[must_use]
pub fn evaluate(recent_timestamps: &[i64], max_per_hour: u32, now: i64) -> RateLimitDecision {
    let count = recent_timestamps.len() as u32;
    let earliest = recent_timestamps.iter().copied().min();
    let next_time_reset = earliest.map_or(now, |t| t + WINDOW_SECS);

    if count >= max_per_hour {
        return RateLimitDecision { allowed: false, info: RateLimitInfo { remaining_attempts: 0, next_time_reset } };
    }
    RateLimitDecision {
        allowed: true,
        info:    RateLimitInfo { remaining_attempts: max_per_hour - count - 1, next_time_reset },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourth_submission_within_the_hour_is_denied() {
        let recent = vec![1_000, 1_100, 1_200];
        let decision = evaluate(&recent, 3, 1_300);
        assert!(!decision.allowed);
        assert_eq!(decision.info.remaining_attempts, 0);
        assert_eq!(decision.info.next_time_reset, 1_000 + WINDOW_SECS);
    }

    #[test]
    fn third_submission_is_allowed_with_zero_remaining() {
        let recent = vec![1_000, 1_100];
        let decision = evaluate(&recent, 3, 1_200);
        assert!(decision.allowed);
        assert_eq!(decision.info.remaining_attempts, 0);
    }
}
