//! Lock-step iteration over two ordered maps
//!
//! Diffing, marking and merging all walk two rosters (or two attribute maps)
//! side by side in key order and dispatch on whether a key exists on the
//! left, on the right, or on both.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::iter::Peekable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paired<'a, K, L, R> {
    LeftOnly(&'a K, &'a L),
    RightOnly(&'a K, &'a R),
    Both(&'a K, &'a L, &'a R),
}

pub struct Parallel<'a, K, L, R> {
    left: Peekable<btree_map::Iter<'a, K, L>>,
    right: Peekable<btree_map::Iter<'a, K, R>>,
}

impl<'a, K: Ord, L, R> Iterator for Parallel<'a, K, L, R> {
    type Item = Paired<'a, K, L, R>;

    fn next(&mut self) -> Option<Self::Item> {
        let order = match (self.left.peek(), self.right.peek()) {
            (None, None) => return None,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((lk, _)), Some((rk, _))) => lk.cmp(rk),
        };

        match order {
            Ordering::Less => {
                let (key, left) = self.left.next()?;
                Some(Paired::LeftOnly(key, left))
            }
            Ordering::Greater => {
                let (key, right) = self.right.next()?;
                Some(Paired::RightOnly(key, right))
            }
            Ordering::Equal => {
                let (key, left) = self.left.next()?;
                let (_, right) = self.right.next()?;
                Some(Paired::Both(key, left, right))
            }
        }
    }
}

pub fn parallel<'a, K: Ord, L, R>(
    left: &'a BTreeMap<K, L>,
    right: &'a BTreeMap<K, R>,
) -> Parallel<'a, K, L, R> {
    Parallel {
        left: left.iter().peekable(),
        right: right.iter().peekable(),
    }
}
