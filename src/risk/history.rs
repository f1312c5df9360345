use std::collections::VecDeque;

/// Bounded sequence of past blended scores for one user, oldest first.
#[derive(Debug, Clone)]
pub struct RiskHistory {
    scores: VecDeque<f64>,
    capacity: usize,
}

impl RiskHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            scores: VecDeque::with_capacity(capacity.min(256)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, score: f64) {
        if self.scores.len() == self.capacity {
            self.scores.pop_front();
        }
        self.scores.push_back(score);
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.scores.iter().copied().collect()
    }

    pub fn last(&self) -> Option<f64> {
        self.scores.back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_past_capacity() {
        let mut h = RiskHistory::new(3);
        for s in [0.1, 0.2, 0.3, 0.4] {
            h.push(s);
        }
        assert_eq!(h.to_vec(), vec![0.2, 0.3, 0.4]);
        assert_eq!(h.last(), Some(0.4));
    }
}
