
/// What happened to a single transaction of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    Malformed,
    /// Not data-bearing, or carrying no transaction id.
    Ignored,
    Untracked,
    Confirmed { name: String, identifier: String },
    AlreadyConfirmed { name: String },
    ExtractionFailed { name: String },
    StoreError,
}

/// Tally of one reconciled batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub transactions_seen: usize,
    pub data_transactions: usize,
    pub malformed: usize,
    pub matched: usize,
    pub confirmed: usize,
    pub already_confirmed: usize,
    pub extraction_failures: usize,
    pub store_errors: usize,
    pub rolled_back: usize,
}

impl ReconcileReport {
    pub(crate) fn tally(&mut self, outcome: &TxOutcome) {
        self.transactions_seen += 1;
        match outcome {
            TxOutcome::Malformed => self.malformed += 1,
            TxOutcome::Ignored => {}
            TxOutcome::Untracked => self.data_transactions += 1,
            TxOutcome::Confirmed { .. } => {
                self.data_transactions += 1;
                self.matched += 1;
                self.confirmed += 1;
            }
            TxOutcome::AlreadyConfirmed { .. } => {
                self.data_transactions += 1;
                self.matched += 1;
                self.already_confirmed += 1;
            }
            TxOutcome::ExtractionFailed { .. } => {
                self.data_transactions += 1;
                self.matched += 1;
                self.extraction_failures += 1;
            }
            TxOutcome::StoreError => {
                self.data_transactions += 1;
                self.store_errors += 1;
            }
        }
    }
}
