use opal_types::{AccountStatus, Mutation, Record, RecordKey, RecordType, TypeError};

use crate::error::TransactionRejected;

/// A mutation split along the record key taxonomy, ready for rule checks.
///
/// Account records become proposed [`AccountStatus`] values (the balance a
/// record carries is the balance the submitter wants committed, not a delta).
/// Everything else is a data record kept alongside its structured key.
#[derive(Clone, Debug)]
pub struct ParsedMutation {
    pub account_entries: Vec<AccountStatus>,
    pub data_records: Vec<(RecordKey, Record)>,
}

impl ParsedMutation {
    pub fn parse(mutation: &Mutation) -> Result<Self, TransactionRejected> {
        let mut account_entries = Vec::new();
        let mut data_records = Vec::new();

        for record in &mutation.records {
            let key = RecordKey::parse(&record.key).map_err(|error| match error {
                TypeError::MalformedPath(_) => TransactionRejected::InvalidPath,
                _ => TransactionRejected::NotAccountMutation,
            })?;
            match key.record_type {
                RecordType::Account => {
                    // The asset portion of an account key is itself a path.
                    let status = AccountStatus::from_record(record).map_err(|error| match error {
                        TypeError::MalformedPath(_) => TransactionRejected::InvalidPath,
                        _ => TransactionRejected::InvalidAccount,
                    })?;
                    account_entries.push(status);
                }
                RecordType::Data => data_records.push((key, record.clone())),
            }
        }

        Ok(Self {
            account_entries,
            data_records,
        })
    }
}
