//! Sales reporting

use crate::{DateRange, SalesReportLine};
use bakehouse_core::{ProcedureName, Result};
use bakehouse_gateway::ProcedureGateway;
use bigdecimal::BigDecimal;

const GET_SALES_REPORT: ProcedureName = ProcedureName::new("dbo.GetSalesReport");

#[derive(Debug, Clone)]
pub struct ReportData {
    gateway: ProcedureGateway,
}

impl ReportData {
    pub fn new(gateway: ProcedureGateway) -> Self {
        Self { gateway }
    }

    /// Quantity and revenue per product, best sellers first
    pub async fn sales(&self, range: DateRange) -> Result<Vec<SalesReportLine>> {
        self.gateway.load_many(GET_SALES_REPORT, &range).await
    }

    pub async fn revenue(&self, range: DateRange) -> Result<BigDecimal> {
        let lines = self.sales(range).await?;
        Ok(lines
            .iter()
            .fold(BigDecimal::from(0), |sum, line| sum + &line.revenue))
    }
}
