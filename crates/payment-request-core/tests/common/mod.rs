#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use payment_request_core::{
    ChildConnector, ChildMessage, ChildTransport, PaymentComplete, PaymentCurrencyAmount,
    PaymentDetailsInit, PaymentDetailsModifier, PaymentDetailsUpdate, PaymentDispatch,
    PaymentError, PaymentItem, PaymentMethodData, PaymentShippingOption,
};

/// Which outbound calls a request made, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    CanMake(String),
    Show(String),
    Abort(String),
    Update(String, PaymentDetailsUpdate),
    Complete(String, PaymentComplete),
}

#[derive(Debug, Default)]
pub struct RecordingDispatch {
    pub calls: Vec<Dispatched>,
    pub fail_with: Option<PaymentError>,
}

impl RecordingDispatch {
    pub fn failing(error: PaymentError) -> Self {
        Self {
            calls: Vec::new(),
            fail_with: Some(error),
        }
    }

    fn record(&mut self, call: Dispatched) -> Result<(), PaymentError> {
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }
        self.calls.push(call);
        Ok(())
    }
}

impl PaymentDispatch for RecordingDispatch {
    fn can_make_payment(&mut self, internal_id: &str) -> Result<(), PaymentError> {
        self.record(Dispatched::CanMake(internal_id.to_owned()))
    }

    fn show_payment(&mut self, internal_id: &str) -> Result<(), PaymentError> {
        self.record(Dispatched::Show(internal_id.to_owned()))
    }

    fn abort_payment(&mut self, internal_id: &str) -> Result<(), PaymentError> {
        self.record(Dispatched::Abort(internal_id.to_owned()))
    }

    fn update_payment(
        &mut self,
        internal_id: &str,
        details: &PaymentDetailsUpdate,
    ) -> Result<(), PaymentError> {
        self.record(Dispatched::Update(internal_id.to_owned(), details.clone()))
    }

    fn complete_payment(
        &mut self,
        internal_id: &str,
        status: PaymentComplete,
    ) -> Result<(), PaymentError> {
        self.record(Dispatched::Complete(internal_id.to_owned(), status))
    }
}

/// Shared outbox of a captured channel.
#[derive(Debug, Default)]
pub struct Outbox {
    pub frames: RefCell<Vec<Vec<u8>>>,
    pub closed: Cell<bool>,
    pub refuse_sends: Cell<bool>,
}

impl Outbox {
    pub fn messages(&self) -> Vec<ChildMessage> {
        self.frames
            .borrow()
            .iter()
            .map(|frame| serde_json::from_slice(frame).expect("child frame decodes"))
            .collect()
    }
}

#[derive(Debug)]
pub struct CapturingTransport {
    id: u64,
    outbox: Rc<Outbox>,
}

impl ChildTransport for CapturingTransport {
    fn channel_id(&self) -> u64 {
        self.id
    }

    fn send(&self, frame: Vec<u8>) -> Result<(), PaymentError> {
        if self.outbox.closed.get() || self.outbox.refuse_sends.get() {
            return Err(PaymentError::Transport("channel closed".to_owned()));
        }
        self.outbox.frames.borrow_mut().push(frame);
        Ok(())
    }

    fn close(&self) {
        self.outbox.closed.set(true);
    }
}

#[derive(Debug, Default)]
struct ConnectorState {
    channels: RefCell<Vec<Rc<Outbox>>>,
    refuse_connect: Cell<bool>,
}

/// Connector whose every channel writes into a fresh, inspectable outbox. Clones share
/// state, so a test keeps one and hands the other to the manager.
#[derive(Debug, Clone, Default)]
pub struct CapturingConnector {
    state: Rc<ConnectorState>,
}

impl CapturingConnector {
    pub fn latest(&self) -> Rc<Outbox> {
        self.state
            .channels
            .borrow()
            .last()
            .cloned()
            .expect("a channel was opened")
    }

    pub fn channel_count(&self) -> usize {
        self.state.channels.borrow().len()
    }

    pub fn refuse_connect(&self, refuse: bool) {
        self.state.refuse_connect.set(refuse);
    }
}

impl ChildConnector for CapturingConnector {
    type Transport = CapturingTransport;

    fn connect(&self) -> Result<CapturingTransport, PaymentError> {
        if self.state.refuse_connect.get() {
            return Err(PaymentError::Transport("no privileged process".to_owned()));
        }
        let outbox = Rc::new(Outbox::default());
        let mut channels = self.state.channels.borrow_mut();
        channels.push(Rc::clone(&outbox));
        Ok(CapturingTransport {
            id: channels.len() as u64,
            outbox,
        })
    }
}

pub fn usd(value: &str) -> PaymentCurrencyAmount {
    PaymentCurrencyAmount::new("USD", value)
}

pub fn donation_method_data() -> Vec<PaymentMethodData> {
    vec![PaymentMethodData {
        supported_methods: vec!["MyPay".to_owned(), "TestPay".to_owned()],
        data: None,
    }]
}

pub fn donation_details() -> PaymentDetailsInit {
    PaymentDetailsInit {
        id: Some("test details".to_owned()),
        total: PaymentItem::new("Donation", "USD", "55.00"),
        display_items: Some(vec![
            PaymentItem::new("Original donation amount", "USD", "-65.00"),
            PaymentItem::new("Friends and family discount", "USD", "10.00"),
        ]),
        shipping_options: None,
        modifiers: Some(vec![PaymentDetailsModifier {
            supported_methods: vec!["MyPay".to_owned()],
            total: PaymentItem::new("Discounted donation", "USD", "45.00"),
            additional_display_items: Some(vec![PaymentItem::new(
                "MyPay discount",
                "USD",
                "-10.00",
            )]),
            data: Some(serde_json::json!({ "discountProgramParticipantId": "86328764873265" })),
        }]),
    }
}

pub fn shipping_options() -> Vec<PaymentShippingOption> {
    vec![
        PaymentShippingOption {
            id: "standard".to_owned(),
            label: "Ground Shipping (2 days)".to_owned(),
            amount: usd("5.00"),
            selected: true,
        },
        PaymentShippingOption {
            id: "drone".to_owned(),
            label: "Drone Express (2 hours)".to_owned(),
            amount: usd("25.00"),
            selected: false,
        },
    ]
}

pub fn plain_update(total: &str) -> PaymentDetailsUpdate {
    PaymentDetailsUpdate {
        total: PaymentItem::new("Donation", "USD", total),
        display_items: None,
        shipping_options: None,
        modifiers: None,
        error: None,
    }
}
