use std::fmt;

use crate::bytes::ByteString;
use crate::error::TypeError;
use crate::path::LedgerPath;
use crate::record::Record;

/// Record key type tag for account-balance records.
const TAG_ACCOUNT: &str = "ACC";
/// Record key type tag for generic data records.
const TAG_DATA: &str = "DATA";

/// Classification of a record key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordType {
    /// An account-balance record: path is the account, name is the asset path.
    Account,
    /// A generic data record: path is the target, name is free-form.
    Data,
}

impl RecordType {
    fn tag(&self) -> &'static str {
        match self {
            RecordType::Account => TAG_ACCOUNT,
            RecordType::Data => TAG_DATA,
        }
    }
}

/// Structured form of a record key: `<path>:<type>:<name>`.
///
/// The `:` character is reserved in path segments, so splitting on the first
/// two separators is unambiguous. The name of an `ACC` key is the asset path;
/// the name of a `DATA` key is a free-form record name (`goldsmith` aliases,
/// `acl` documents, asset definitions).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordKey {
    pub record_type: RecordType,
    pub path: LedgerPath,
    pub name: String,
}

impl RecordKey {
    /// Build an account-balance key.
    pub fn account(account: &LedgerPath, asset: &LedgerPath) -> Self {
        Self {
            record_type: RecordType::Account,
            path: account.clone(),
            name: asset.full_path(),
        }
    }

    /// Build a data key.
    pub fn data(path: &LedgerPath, name: &str) -> Self {
        Self {
            record_type: RecordType::Data,
            path: path.clone(),
            name: name.to_string(),
        }
    }

    /// Parse a raw record key.
    ///
    /// Fails with [`TypeError::MalformedPath`] when the path portion is not
    /// a valid ledger path, and [`TypeError::InvalidRecordKey`] on non-UTF-8
    /// keys or unknown type tags.
    pub fn parse(key: &ByteString) -> Result<Self, TypeError> {
        let text = std::str::from_utf8(key.as_bytes()).map_err(|_| TypeError::InvalidRecordKey)?;

        let mut parts = text.splitn(3, ':');
        let path_part = parts.next().ok_or(TypeError::InvalidRecordKey)?;
        let tag = parts.next().ok_or(TypeError::InvalidRecordKey)?;
        let name = parts.next().ok_or(TypeError::InvalidRecordKey)?;

        let path = LedgerPath::parse(path_part)?;

        let record_type = match tag {
            TAG_ACCOUNT => RecordType::Account,
            TAG_DATA => RecordType::Data,
            _ => return Err(TypeError::InvalidRecordKey),
        };

        Ok(Self {
            record_type,
            path,
            name: name.to_string(),
        })
    }

    /// The raw byte form stored in the ledger.
    pub fn to_byte_string(&self) -> ByteString {
        ByteString::from(
            format!("{}:{}:{}", self.path.full_path(), self.record_type.tag(), self.name).as_str(),
        )
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.path.full_path(),
            self.record_type.tag(),
            self.name
        )
    }
}

/// Identifies one balance slot: an account path paired with an asset path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AccountKey {
    pub account: LedgerPath,
    pub asset: LedgerPath,
}

impl AccountKey {
    pub fn new(account: LedgerPath, asset: LedgerPath) -> Self {
        Self { account, asset }
    }

    /// Parse from textual account and asset paths.
    pub fn parse(account: &str, asset: &str) -> Result<Self, TypeError> {
        Ok(Self {
            account: LedgerPath::parse(account)?,
            asset: LedgerPath::parse(asset)?,
        })
    }

    /// The raw record key addressing this balance slot.
    pub fn record_key(&self) -> ByteString {
        RecordKey::account(&self.account, &self.asset).to_byte_string()
    }
}

/// The state of one balance slot: the key, a signed balance and the version
/// token of its last write. An empty version token means the slot does not
/// exist yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountStatus {
    pub account_key: AccountKey,
    pub balance: i64,
    pub version: ByteString,
}

impl AccountStatus {
    pub fn new(account_key: AccountKey, balance: i64, version: ByteString) -> Self {
        Self {
            account_key,
            balance,
            version,
        }
    }

    /// The "does not exist yet" state for a key: zero balance, empty version.
    pub fn missing(account_key: AccountKey) -> Self {
        Self::new(account_key, 0, ByteString::empty())
    }

    /// Interpret a ledger record as an account status.
    ///
    /// The record key must parse as an `ACC` key and the value must be a
    /// present 8-byte big-endian signed balance.
    pub fn from_record(record: &Record) -> Result<Self, TypeError> {
        let key = RecordKey::parse(&record.key)?;
        if key.record_type != RecordType::Account {
            return Err(TypeError::InvalidRecordKey);
        }
        let asset = LedgerPath::parse(&key.name)?;

        let value = record.value.as_ref().ok_or(TypeError::InvalidRecordKey)?;
        let balance = decode_balance(value)?;

        Ok(Self {
            account_key: AccountKey::new(key.path, asset),
            balance,
            version: record.version.clone(),
        })
    }

    /// Render this status as the ledger record that would store it.
    pub fn to_record(&self) -> Record {
        Record::new(
            self.account_key.record_key(),
            Some(encode_balance(self.balance)),
            self.version.clone(),
        )
    }
}

/// Encode a balance as its 8-byte big-endian record value.
pub fn encode_balance(balance: i64) -> ByteString {
    ByteString::new(balance.to_be_bytes().to_vec())
}

/// Decode an 8-byte big-endian record value into a balance.
pub fn decode_balance(value: &ByteString) -> Result<i64, TypeError> {
    let bytes: [u8; 8] = value
        .as_bytes()
        .try_into()
        .map_err(|_| TypeError::InvalidLength {
            expected: 8,
            actual: value.len(),
        })?;
    Ok(i64::from_be_bytes(bytes))
}
