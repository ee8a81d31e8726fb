use crate::Amount;

/// A user's wallet balance. Never negative.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Wallet {
    balance: Amount,
}

impl Wallet {
    pub fn with_balance(balance: Amount) -> Self {
        Self { balance }
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Balance after crediting `amount`, or `None` on overflow.
    pub fn credited(&self, amount: Amount) -> Option<Amount> {
        self.balance.checked_add(amount)
    }

    pub fn can_debit(&self, amount: Amount) -> bool {
        amount <= self.balance
    }

    pub fn debit(&mut self, amount: Amount) {
        debug_assert!(self.can_debit(amount));
        self.balance -= amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_default_is_empty() {
        assert_eq!(Wallet::default().balance(), Amount::ZERO);
    }

    #[test]
    fn credited_then_debit_move_balance() {
        let wallet = Wallet::with_balance(Amount::from_minor(100));
        let credited = wallet.credited(Amount::from_minor(50)).unwrap();
        assert_eq!(credited, Amount::from_minor(150));

        let mut wallet = Wallet::with_balance(credited);
        wallet.debit(Amount::from_minor(150));
        assert_eq!(wallet.balance(), Amount::ZERO);
    }

    #[test]
    fn can_debit_up_to_balance() {
        let wallet = Wallet::with_balance(Amount::from_minor(100));
        assert!(wallet.can_debit(Amount::from_minor(100)));
        assert!(!wallet.can_debit(Amount::from_minor(101)));
    }

    #[test]
    fn credited_detects_overflow() {
        let wallet = Wallet::with_balance(Amount::from_minor(i64::MAX));
        assert_eq!(wallet.credited(Amount::from_minor(1)), None);
    }
}
