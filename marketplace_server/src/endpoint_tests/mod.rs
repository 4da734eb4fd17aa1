mod catalog;
mod checkout;
mod helpers;
mod mocks;
