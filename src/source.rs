use chrono_tz::Tz;

use crate::domain::{
    Customer, MonthlyTrendRow, Order, RegionalRevenueRow, RepeatCustomerRow, TopSpenderRow,
};
use crate::error::Result;
use crate::kpi;

/// Capability every KPI backend provides. The in-memory and SQLite variants
/// implement this once; callers (and the contract tests) never care which one
/// they hold.
pub trait KpiSource {
    fn repeat_customers(&self) -> Result<Vec<RepeatCustomerRow>>;
    fn monthly_trends(&self) -> Result<Vec<MonthlyTrendRow>>;
    fn regional_revenue(&self) -> Result<Vec<RegionalRevenueRow>>;
    fn top_spenders(&self, top_n: usize) -> Result<Vec<TopSpenderRow>>;
}

/// KPI backend computing directly over the canonical tables.
pub struct InMemorySource {
    customers: Vec<Customer>,
    orders: Vec<Order>,
    zone: Tz,
}

impl InMemorySource {
    pub fn new(customers: Vec<Customer>, orders: Vec<Order>, zone: Tz) -> Self {
        Self { customers, orders, zone }
    }
}

impl KpiSource for InMemorySource {
    fn repeat_customers(&self) -> Result<Vec<RepeatCustomerRow>> {
        Ok(kpi::repeat_customers(&self.orders, &self.customers))
    }

    fn monthly_trends(&self) -> Result<Vec<MonthlyTrendRow>> {
        Ok(kpi::monthly_trends(&self.orders, self.zone))
    }

    fn regional_revenue(&self) -> Result<Vec<RegionalRevenueRow>> {
        Ok(kpi::regional_revenue(&self.orders, &self.customers))
    }

    fn top_spenders(&self, top_n: usize) -> Result<Vec<TopSpenderRow>> {
        Ok(kpi::top_spenders(&self.orders, &self.customers, self.zone, top_n))
    }
}

/// The four KPI results of one run, computed in a single pass over a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiSet {
    pub repeat_customers: Vec<RepeatCustomerRow>,
    pub monthly_trends: Vec<MonthlyTrendRow>,
    pub regional_revenue: Vec<RegionalRevenueRow>,
    pub top_spenders: Vec<TopSpenderRow>,
}

impl KpiSet {
    pub fn compute(source: &dyn KpiSource, top_n: usize) -> Result<Self> {
        Ok(KpiSet {
            repeat_customers: source.repeat_customers()?,
            monthly_trends: source.monthly_trends()?,
            regional_revenue: source.regional_revenue()?,
            top_spenders: source.top_spenders(top_n)?,
        })
    }
}
