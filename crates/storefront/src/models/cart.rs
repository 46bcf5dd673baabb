//! Session-scoped shopping cart.
//!
//! The cart is plain data: one line per photo, each with a selected size and
//! an implicit quantity of one. It is serialised into the session under
//! [`keys::CART`](super::session_keys::CART).

use serde::{Deserialize, Serialize};

use photostock_core::{PhotoId, PhotoSize};

/// A single cart entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub photo_id: PhotoId,
    pub size: PhotoSize,
}

impl CartLine {
    /// Digital downloads are always bought one at a time.
    pub const QUANTITY: u32 = 1;
}

/// Ordered collection of cart lines, unique by photo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    #[must_use]
    pub fn get(&self, photo_id: PhotoId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.photo_id == photo_id)
    }

    /// Insert a line, replacing any existing line for the same photo.
    pub fn set(&mut self, photo_id: PhotoId, size: PhotoSize) {
        match self.lines.iter_mut().find(|line| line.photo_id == photo_id) {
            Some(line) => line.size = size,
            None => self.lines.push(CartLine { photo_id, size }),
        }
    }

    /// Remove the line for a photo. Returns whether one was present.
    pub fn remove(&mut self, photo_id: PhotoId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.photo_id != photo_id);
        self.lines.len() != before
    }

    /// Change the size of an existing line. Absent photos are left alone.
    pub fn update_size(&mut self, photo_id: PhotoId, size: PhotoSize) -> bool {
        self.lines
            .iter_mut()
            .find(|line| line.photo_id == photo_id)
            .map(|line| line.size = size)
            .is_some()
    }

    /// Drop the lines that were paid for.
    ///
    /// A line is only removed when both photo and size still match, so a line
    /// added or resized after the checkout started stays in the cart.
    pub fn remove_purchased(&mut self, purchased: &[CartLine]) {
        self.lines.retain(|line| !purchased.contains(line));
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl FromIterator<CartLine> for Cart {
    fn from_iter<I: IntoIterator<Item = CartLine>>(iter: I) -> Self {
        let mut cart = Self::new();
        for line in iter {
            cart.set(line.photo_id, line.size);
        }
        cart
    }
}
