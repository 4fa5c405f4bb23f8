//! Customer records, looked up by phone number at the counter

use crate::{Customer, insert_returning_id, require_text};
use bakehouse_core::{ProcedureName, Result};
use bakehouse_gateway::{NoParams, ProcedureGateway, procedure_params};

const GET_CUSTOMERS: ProcedureName = ProcedureName::new("dbo.GetCustomers");
const GET_CUSTOMER_BY_PHONE: ProcedureName = ProcedureName::new("dbo.GetCustomerByPhone");
const INSERT_CUSTOMER: ProcedureName = ProcedureName::new("dbo.InsertCustomer");
const UPDATE_CUSTOMER: ProcedureName = ProcedureName::new("dbo.UpdateCustomer");

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

procedure_params!(NewCustomer {
    name => "Name",
    phone => "Phone",
    email => "Email",
    address => "Address",
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerUpdate {
    pub customer_id: i64,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

procedure_params!(CustomerUpdate {
    customer_id => "CustomerId",
    name => "Name",
    phone => "Phone",
    email => "Email",
    address => "Address",
});

impl From<Customer> for CustomerUpdate {
    fn from(customer: Customer) -> Self {
        Self {
            customer_id: customer.customer_id,
            name: customer.name,
            phone: customer.phone,
            email: customer.email,
            address: customer.address,
        }
    }
}

struct PhoneKey<'a> {
    phone: &'a str,
}

procedure_params!(PhoneKey<'_> { phone => "Phone" });

#[derive(Debug, Clone)]
pub struct CustomerData {
    gateway: ProcedureGateway,
}

impl CustomerData {
    pub fn new(gateway: ProcedureGateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self) -> Result<Vec<Customer>> {
        self.gateway.load_many(GET_CUSTOMERS, &NoParams).await
    }

    /// Look a customer up by phone number, ignoring spaces and dashes
    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<Customer>> {
        let phone = normalize_phone(phone);
        self.gateway
            .load_first(GET_CUSTOMER_BY_PHONE, &PhoneKey { phone: &phone })
            .await
    }

    pub async fn insert(&self, customer: &NewCustomer) -> Result<i64> {
        require_text("customer name", &customer.name)?;
        require_text("phone", &customer.phone)?;
        let customer = NewCustomer {
            phone: normalize_phone(&customer.phone),
            ..customer.clone()
        };
        insert_returning_id(&self.gateway, INSERT_CUSTOMER, &customer).await
    }

    pub async fn update(&self, customer: &CustomerUpdate) -> Result<()> {
        require_text("customer name", &customer.name)?;
        require_text("phone", &customer.phone)?;
        let customer = CustomerUpdate {
            phone: normalize_phone(&customer.phone),
            ..customer.clone()
        };
        self.gateway.execute(UPDATE_CUSTOMER, &customer).await
    }
}

/// Phone numbers are stored without separators
pub(crate) fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect()
}
