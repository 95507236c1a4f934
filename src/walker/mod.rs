//! Bottom-up directory walker
//!
//! Produces every directory of a tree strictly after all of its descendant
//! directories, root last. The deletion coordinator deals these out to
//! workers as they are produced, so deletion starts at the leaves while
//! the walk is still descending elsewhere.
//!
//! # Ordering
//!
//! ```text
//!   a/            yields:  a/b/c
//!   ├── b/                 a/b/d
//!   │   ├── c/             a/b
//!   │   └── d/             a/e
//!   └── e/                 a
//! ```

pub mod bottom_up;

pub use bottom_up::BottomUpDirs;
