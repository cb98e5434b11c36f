//! In-memory cart store.
//!
//! Authoritative client-side cache of the user's current selection. Pure
//! data plus a mutation API keyed by product id; no I/O, no validation.
//! This layer trusts its caller — price integrity is enforced later, at
//! checkout verification.

use std::collections::HashMap;

use crate::types::CartLine;

/// In-memory map of cart lines keyed by product id.
#[derive(Debug, Default, Clone)]
pub struct CartStore {
    lines: HashMap<String, CartLine>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line, accumulating quantity if the product is already present.
    ///
    /// An incoming line for an existing product also refreshes its display
    /// metadata and cached price.
    pub fn add(&mut self, line: CartLine) {
        match self.lines.get_mut(&line.product_id) {
            Some(existing) => {
                existing.quantity += line.quantity;
                existing.name = line.name;
                existing.image_url = line.image_url;
                existing.unit_price_cents = line.unit_price_cents;
                existing.original_price_cents = line.original_price_cents;
            }
            None => {
                self.lines.insert(line.product_id.clone(), line);
            }
        }
    }

    /// Remove a line by product id. Unknown ids are a no-op.
    pub fn remove(&mut self, product_id: &str) {
        self.lines.remove(product_id);
    }

    /// Set the quantity of a line. `quantity <= 0` removes the line;
    /// unknown ids are a no-op.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) {
        if quantity <= 0 {
            self.lines.remove(product_id);
        } else if let Some(line) = self.lines.get_mut(product_id) {
            line.quantity = quantity;
        }
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Current lines, in no particular order.
    pub fn lines(&self) -> Vec<CartLine> {
        self.lines.values().cloned().collect()
    }

    pub fn get(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.get(product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of items (sum of quantities).
    pub fn count(&self) -> i64 {
        self.lines.values().map(|l| l.quantity).sum()
    }

    /// Subtotal over all lines, from client-cached prices.
    pub fn subtotal_cents(&self) -> i64 {
        self.lines
            .values()
            .map(|l| l.unit_price_cents * l.quantity)
            .sum()
    }

    /// Total savings: `(original - price) * qty` over discounted lines.
    pub fn savings_cents(&self) -> i64 {
        self.lines
            .values()
            .filter_map(|l| {
                l.original_price_cents
                    .map(|orig| (orig - l.unit_price_cents) * l.quantity)
            })
            .sum()
    }

    /// Subtotal restricted to a subset of product ids.
    pub fn total_of(&self, product_ids: &[String]) -> i64 {
        product_ids
            .iter()
            .filter_map(|id| self.lines.get(id))
            .map(|l| l.unit_price_cents * l.quantity)
            .sum()
    }
}
