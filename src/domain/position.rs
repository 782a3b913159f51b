//! Cash/shares/cost-basis bookkeeping for the single simulated holding.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionState {
    pub shares: f64,
    pub avg_cost_per_share: f64,
    pub cash: f64,
    /// Highest NAV seen while holding; 0 when flat.
    pub peak_nav_since_entry: f64,
    /// Number of times a position was opened from flat.
    pub entries: usize,
}

/// Cash and share movement produced by one executed order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub shares_delta: f64,
    pub cash_delta: f64,
}

impl PositionState {
    pub fn new(cash: f64) -> Self {
        PositionState {
            shares: 0.0,
            avg_cost_per_share: 0.0,
            cash,
            peak_nav_since_entry: 0.0,
            entries: 0,
        }
    }

    pub fn is_holding(&self) -> bool {
        self.shares > 0.0
    }

    pub fn cost_basis(&self) -> f64 {
        self.shares * self.avg_cost_per_share
    }

    pub fn market_value(&self, nav: f64) -> f64 {
        self.shares * nav
    }

    /// (market value - cost basis) / cost basis; 0 with no cost basis.
    pub fn return_on_cost(&self, nav: f64) -> f64 {
        let basis = self.cost_basis();
        if basis <= 0.0 {
            return 0.0;
        }
        let r = (self.market_value(nav) - basis) / basis;
        if r.is_finite() { r } else { 0.0 }
    }

    /// Retracement of `nav` below the average cost; 0 when flat.
    pub fn drop_from_cost(&self, nav: f64) -> f64 {
        if self.avg_cost_per_share <= 0.0 {
            return 0.0;
        }
        (self.avg_cost_per_share - nav) / self.avg_cost_per_share
    }

    /// Track the running peak while holding.
    pub fn observe(&mut self, nav: f64) {
        if self.is_holding() && nav > self.peak_nav_since_entry {
            self.peak_nav_since_entry = nav;
        }
    }

    /// Invest `amount` at `nav`, clamped to the available cash.
    pub fn buy(&mut self, amount: f64, nav: f64) -> Option<Fill> {
        let amount = amount.min(self.cash);
        if amount <= 0.0 || nav <= 0.0 {
            return None;
        }
        let new_shares = amount / nav;
        if !self.is_holding() {
            self.entries += 1;
            self.peak_nav_since_entry = nav;
        }
        self.avg_cost_per_share =
            (self.shares * self.avg_cost_per_share + amount) / (self.shares + new_shares);
        self.shares += new_shares;
        self.cash = (self.cash - amount).max(0.0);
        Some(Fill {
            shares_delta: new_shares,
            cash_delta: -amount,
        })
    }

    /// Sell `fraction` of the holding at `nav`. Average cost is unchanged by
    /// a partial sell (cost basis shrinks proportionally) and reset to 0 when
    /// the position is closed.
    pub fn sell(&mut self, fraction: f64, nav: f64) -> Option<Fill> {
        if !self.is_holding() || fraction <= 0.0 {
            return None;
        }
        let fraction = fraction.min(1.0);
        let sold = if fraction >= 1.0 {
            self.shares
        } else {
            self.shares * fraction
        };
        let proceeds = sold * nav;
        self.cash += proceeds;
        if fraction >= 1.0 {
            self.shares = 0.0;
            self.avg_cost_per_share = 0.0;
            self.peak_nav_since_entry = 0.0;
        } else {
            self.shares -= sold;
        }
        Some(Fill {
            shares_delta: -sold,
            cash_delta: proceeds,
        })
    }
}
