//! Part of Component H: the BPE merge engine.
//!
//! A pre-token is split into graphemes and merged greedily by rank using a
//! doubly-linked list of positions plus a min-heap of mergeable adjacent
//! pairs. Lazy deletion (alive flag + version counter) avoids re-scanning
//! the heap when a position dies or is re-merged.

use lru::LruCache;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use unicode_segmentation::UnicodeSegmentation;

const CACHE_KEY_MAX_LEN: usize = 256;
const CACHE_CAPACITY: usize = 4096;

pub struct BpeModel {
    pub vocab: HashMap<String, u32>,
    pub merges: HashMap<(String, String), u32>,
    pub unk_token: Option<String>,
    pub byte_fallback: bool,
    pub continuing_subword_suffix: Option<String>,
    pub end_of_word_suffix: Option<String>,
    cache: Mutex<LruCache<String, Vec<String>>>,
}

impl BpeModel {
    pub fn new(
        vocab: HashMap<String, u32>,
        merges: HashMap<(String, String), u32>,
        unk_token: Option<String>,
        byte_fallback: bool,
        continuing_subword_suffix: Option<String>,
        end_of_word_suffix: Option<String>,
    ) -> Self {
        Self {
            vocab,
            merges,
            unk_token,
            byte_fallback,
            continuing_subword_suffix,
            end_of_word_suffix,
            cache: Mutex::new(LruCache::new(NonZeroUsize::new(CACHE_CAPACITY).unwrap())),
        }
    }

    /// Run one pre-token through the merge engine, returning its subwords.
    pub fn tokenize(&self, pre_token: &str) -> Vec<String> {
        if pre_token.len() < CACHE_KEY_MAX_LEN {
            if let Some(hit) = self.cache.lock().unwrap().get(pre_token) {
                return hit.clone();
            }
        }

        let result = self.merge(pre_token);

        if pre_token.len() < CACHE_KEY_MAX_LEN {
            self.cache.lock().unwrap().put(pre_token.to_string(), result.clone());
        }
        result
    }

    fn merge(&self, pre_token: &str) -> Vec<String> {
        let mut graphemes: Vec<String> = pre_token.graphemes(true).map(|g| g.to_string()).collect();
        if graphemes.is_empty() {
            return graphemes;
        }
        if let Some(suffix) = &self.end_of_word_suffix {
            if let Some(last) = graphemes.last_mut() {
                last.push_str(suffix);
            }
        }

        let n = graphemes.len();
        let mut text: Vec<String> = graphemes;
        let mut prev: Vec<Option<usize>> = (0..n).map(|i| if i == 0 { None } else { Some(i - 1) }).collect();
        let mut next: Vec<Option<usize>> = (0..n).map(|i| if i + 1 < n { Some(i + 1) } else { None }).collect();
        let mut alive = vec![true; n];
        let mut version = vec![0u32; n];

        let mut heap: BinaryHeap<Reverse<(u32, usize, usize, usize, u32, u32)>> = BinaryHeap::new();
        let push_pair = |heap: &mut BinaryHeap<Reverse<(u32, usize, usize, usize, u32, u32)>>, merges: &HashMap<(String, String), u32>, text: &[String], left: usize, right: usize, vl: u32, vr: u32| {
            if let Some(&rank) = merges.get(&(text[left].clone(), text[right].clone())) {
                let tie = left.min(right);
                heap.push(Reverse((rank, tie, left, right, vl, vr)));
            }
        };

        for i in 0..n.saturating_sub(1) {
            push_pair(&mut heap, &self.merges, &text, i, i + 1, version[i], version[i + 1]);
        }

        while let Some(Reverse((_, _, left, right, vl, vr))) = heap.pop() {
            if !alive[left] || !alive[right] || version[left] != vl || version[right] != vr {
                continue;
            }

            let merged = format!("{}{}", text[left], text[right]);
            text[left] = merged;
            alive[right] = false;
            version[left] += 1;

            let new_next = next[right];
            next[left] = new_next;
            if let Some(nn) = new_next {
                prev[nn] = Some(left);
            }

            if let Some(p) = prev[left] {
                push_pair(&mut heap, &self.merges, &text, p, left, version[p], version[left]);
            }
            if let Some(nn) = next[left] {
                push_pair(&mut heap, &self.merges, &text, left, nn, version[left], version[nn]);
            }
        }

        let mut result = Vec::with_capacity(n);
        let mut cursor = Some(0usize);
        while let Some(i) = cursor {
            if alive[i] {
                result.push(text[i].clone());
            }
            cursor = next[i];
        }

        if let Some(suffix) = &self.continuing_subword_suffix {
            let last = result.len().saturating_sub(1);
            for (i, piece) in result.iter_mut().enumerate() {
                if i != last {
                    piece.push_str(suffix);
                }
            }
        }

        result
    }

    /// Count vocab-equivalent tokens for one pre-token's subwords, applying
    /// byte-fallback and the unk-token policy in order.
    pub fn count_subwords(&self, subwords: &[String]) -> usize {
        subwords.iter().map(|sw| self.count_one(sw)).sum()
    }

    fn count_one(&self, subword: &str) -> usize {
        if self.vocab.contains_key(subword) {
            return 1;
        }
        if self.byte_fallback {
            let bytes = subword.as_bytes();
            if bytes.iter().all(|b| self.vocab.contains_key(&format!("<0x{b:02X}>"))) {
                return bytes.len();
            }
        }
        if self.unk_token.is_some() {
            return 1;
        }
        subword.chars().count().max(1)
    }
}
