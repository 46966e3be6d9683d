mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use payment_request_core::wire::{IpcMethodData, IpcPaymentDetails, IpcPaymentOptions};
use payment_request_core::{
    AbortStatus, AcceptStatus, ActionKind, ActionRequest, ActionResponse, ChangeNotification,
    PaymentActionRequest, PaymentAddress, PaymentComplete, PaymentError, PaymentOptions,
    PaymentRequestService, PaymentUiPort, ResponseCallback, ResponseSink, ServicePaymentRequest,
    ServiceResponse, UiReply,
};

use common::{donation_details, donation_method_data, plain_update};

#[derive(Default)]
struct RecordingSink {
    dead: Cell<bool>,
    responses: RefCell<Vec<ServiceResponse>>,
    notifications: RefCell<Vec<ChangeNotification>>,
}

impl ResponseSink for RecordingSink {
    fn is_alive(&self) -> bool {
        !self.dead.get()
    }

    fn respond_payment(&self, response: ServiceResponse) -> Result<(), PaymentError> {
        self.responses.borrow_mut().push(response);
        Ok(())
    }

    fn notify(&self, notification: ChangeNotification) -> Result<(), PaymentError> {
        self.notifications.borrow_mut().push(notification);
        Ok(())
    }
}

fn callback_for(sink: &Rc<RecordingSink>) -> ResponseCallback {
    let sink: Rc<dyn ResponseSink> = sink.clone();
    ResponseCallback::new(Rc::downgrade(&sink))
}

#[derive(Default)]
struct RecordingUi {
    refuse: Cell<bool>,
    calls: RefCell<Vec<(ActionKind, String)>>,
    replies: RefCell<Vec<UiReply>>,
    updates: Cell<usize>,
}

impl RecordingUi {
    fn take(
        &self,
        kind: ActionKind,
        request: &ServicePaymentRequest,
        reply: UiReply,
    ) -> Result<(), PaymentError> {
        if self.refuse.get() {
            return Err(PaymentError::NotSupported("no payment UI".to_owned()));
        }
        self.calls
            .borrow_mut()
            .push((kind, request.request_id().to_owned()));
        self.replies.borrow_mut().push(reply);
        Ok(())
    }

    fn last_reply(&self) -> UiReply {
        self.replies
            .borrow()
            .last()
            .cloned()
            .expect("the UI was asked something")
    }
}

impl PaymentUiPort for RecordingUi {
    fn can_make_payment(
        &self,
        request: &ServicePaymentRequest,
        reply: UiReply,
    ) -> Result<(), PaymentError> {
        self.take(ActionKind::CanMake, request, reply)
    }

    fn show_payment(
        &self,
        request: &ServicePaymentRequest,
        reply: UiReply,
    ) -> Result<(), PaymentError> {
        self.take(ActionKind::Show, request, reply)
    }

    fn abort_payment(
        &self,
        request: &ServicePaymentRequest,
        reply: UiReply,
    ) -> Result<(), PaymentError> {
        self.take(ActionKind::Abort, request, reply)
    }

    fn complete_payment(
        &self,
        request: &ServicePaymentRequest,
        _status: PaymentComplete,
        reply: UiReply,
    ) -> Result<(), PaymentError> {
        self.take(ActionKind::Complete, request, reply)
    }

    fn update_payment(&self, _request: &ServicePaymentRequest) -> Result<(), PaymentError> {
        self.updates.set(self.updates.get() + 1);
        Ok(())
    }
}

const ID: &str = "request-1";

fn action(request: ActionRequest, sink: &Rc<RecordingSink>) -> PaymentActionRequest {
    PaymentActionRequest::from_wire(request, callback_for(sink))
}

fn created_service(sink: &Rc<RecordingSink>) -> PaymentRequestService<RecordingUi> {
    let mut service = PaymentRequestService::new(RecordingUi::default());
    let method_data = donation_method_data()
        .iter()
        .map(IpcMethodData::from_method_data)
        .collect::<Result<Vec<_>, _>>()
        .expect("method data");
    service
        .request_payment(action(
            ActionRequest::Create {
                tab_id: 3,
                request_id: ID.to_owned(),
                method_data,
                details: IpcPaymentDetails::from_init(&donation_details(), "test details")
                    .expect("details"),
                options: IpcPaymentOptions::from(&PaymentOptions::default()),
            },
            sink,
        ))
        .expect("create");
    service
}

fn simple(kind: &str) -> ActionRequest {
    let request_id = ID.to_owned();
    match kind {
        "can_make" => ActionRequest::CanMake { request_id },
        "show" => ActionRequest::Show { request_id },
        "abort" => ActionRequest::Abort { request_id },
        _ => ActionRequest::Complete {
            request_id,
            complete_status: PaymentComplete::Success,
        },
    }
}

#[test]
fn create_materializes_a_record_visible_through_enumerate() {
    let sink = Rc::new(RecordingSink::default());
    let service = created_service(&sink);
    assert_eq!(service.enumerate().len(), 1);

    let record = service.get_by_id(ID).expect("record");
    assert_eq!(record.tab_id(), 3);
    assert_eq!(record.method_data()[0].supported_methods, vec!["MyPay", "TestPay"]);
    assert_eq!(record.method_data()[0].data, None);
    assert_eq!(record.details().id, "test details");
    assert_eq!(record.details().total_item.amount.value, "55.00");
    assert!(!record.has_callback());
}

#[test]
fn duplicate_create_and_unknown_ids_are_rejected() {
    let sink = Rc::new(RecordingSink::default());
    let mut service = created_service(&sink);
    let duplicate = ActionRequest::Create {
        tab_id: 3,
        request_id: ID.to_owned(),
        method_data: Vec::new(),
        details: IpcPaymentDetails::from_init(&donation_details(), ID).expect("details"),
        options: IpcPaymentOptions::from(&PaymentOptions::default()),
    };
    assert!(matches!(
        service.request_payment(action(duplicate, &sink)),
        Err(PaymentError::InvalidState(_))
    ));

    let show_other = ActionRequest::Show {
        request_id: "other".to_owned(),
    };
    assert!(matches!(
        service.request_payment(action(show_other, &sink)),
        Err(PaymentError::NotFound(_))
    ));
}

#[test]
fn ui_replies_are_only_delivered_from_the_sequence() {
    let sink = Rc::new(RecordingSink::default());
    let mut service = created_service(&sink);
    service
        .request_payment(action(simple("show"), &sink))
        .expect("show");
    assert!(service.get_by_id(ID).expect("record").has_callback());

    service
        .ui()
        .last_reply()
        .respond(ServiceResponse::rejected_show(ID))
        .expect("post reply");
    assert!(sink.responses.borrow().is_empty());

    assert_eq!(service.run_until_idle(), 1);
    assert_eq!(
        sink.responses.borrow().as_slice(),
        &[ServiceResponse::rejected_show(ID)]
    );
    assert!(service.get_by_id(ID).is_none());
}

#[test]
fn a_refusing_ui_still_owes_one_response() {
    let sink = Rc::new(RecordingSink::default());
    let mut service = created_service(&sink);
    service.ui().refuse.set(true);
    service
        .request_payment(action(simple("can_make"), &sink))
        .expect("can make is accepted");
    service.run_until_idle();
    assert_eq!(
        sink.responses.borrow().as_slice(),
        &[ServiceResponse::CanMake {
            request_id: ID.to_owned(),
            result: false,
        }]
    );
}

#[test]
fn overlapping_actions_keep_the_callback_until_the_last_answer() {
    let sink = Rc::new(RecordingSink::default());
    let mut service = created_service(&sink);
    service
        .request_payment(action(simple("can_make"), &sink))
        .expect("can make");
    service
        .request_payment(action(simple("show"), &sink))
        .expect("show");

    service
        .respond_payment(ServiceResponse::CanMake {
            request_id: ID.to_owned(),
            result: true,
        })
        .expect("can make answer");
    let record = service.get_by_id(ID).expect("record");
    assert!(record.has_callback());
    assert_eq!(record.outstanding(), &[ActionKind::Show]);

    service
        .respond_payment(ServiceResponse::Show {
            request_id: ID.to_owned(),
            status: AcceptStatus::Accepted,
            method_name: "VISA".to_owned(),
            data: "{}".to_owned(),
            payer_name: String::new(),
            payer_email: String::new(),
            payer_phone: String::new(),
        })
        .expect("show answer");
    assert!(!service.get_by_id(ID).expect("record").has_callback());
    assert_eq!(sink.responses.borrow().len(), 2);

    // never twice
    assert!(matches!(
        service.respond_payment(ServiceResponse::rejected_show(ID)),
        Err(PaymentError::Unexpected(_))
    ));
}

#[test]
fn a_declined_sheet_drops_the_record_once_nothing_is_outstanding() {
    let sink = Rc::new(RecordingSink::default());
    let mut service = created_service(&sink);
    service
        .request_payment(action(simple("show"), &sink))
        .expect("show");
    service
        .request_payment(action(simple("abort"), &sink))
        .expect("abort");

    service
        .respond_payment(ServiceResponse::rejected_show(ID))
        .expect("show answer");
    let record = service.get_by_id(ID).expect("record waits for the abort answer");
    assert!(record.is_declined());
    assert_eq!(record.outstanding(), &[ActionKind::Abort]);

    service
        .respond_payment(ServiceResponse::Abort {
            request_id: ID.to_owned(),
            status: AbortStatus::Failed,
        })
        .expect("abort answer");
    assert!(service.get_by_id(ID).is_none());
    assert_eq!(sink.responses.borrow().len(), 2);
}

#[test]
fn terminal_responses_drop_the_record() {
    let sink = Rc::new(RecordingSink::default());
    let mut service = created_service(&sink);
    service
        .request_payment(action(simple("show"), &sink))
        .expect("show");
    service
        .request_payment(action(simple("abort"), &sink))
        .expect("abort");

    service
        .respond_payment(ServiceResponse::Abort {
            request_id: ID.to_owned(),
            status: AbortStatus::Succeeded,
        })
        .expect("abort answer");
    assert!(service.get_by_id(ID).is_none());
    assert!(matches!(
        service.respond_payment(ServiceResponse::rejected_show(ID)),
        Err(PaymentError::NotFound(_))
    ));
}

#[test]
fn failed_abort_keeps_the_record() {
    let sink = Rc::new(RecordingSink::default());
    let mut service = created_service(&sink);
    service
        .request_payment(action(simple("show"), &sink))
        .expect("show");
    service
        .request_payment(action(simple("abort"), &sink))
        .expect("abort");
    service
        .respond_payment(ServiceResponse::Abort {
            request_id: ID.to_owned(),
            status: AbortStatus::Failed,
        })
        .expect("abort answer");
    assert!(service.get_by_id(ID).is_some());
}

#[test]
fn notifications_do_not_need_an_outstanding_action() {
    let sink = Rc::new(RecordingSink::default());
    let mut service = created_service(&sink);
    service
        .change_shipping_address(
            ID,
            PaymentAddress {
                country: "US".to_owned(),
                city: "Mountain View".to_owned(),
                ..PaymentAddress::default()
            },
        )
        .expect("address change");
    service
        .change_shipping_option(ID, "drone".to_owned())
        .expect("option change");

    let notifications = sink.notifications.borrow();
    assert_eq!(notifications.len(), 2);
    match &notifications[0] {
        ChangeNotification::ShippingAddress { request_id, address } => {
            assert_eq!(request_id, ID);
            assert_eq!(address.city, "Mountain View");
        }
        other => panic!("expected an address change, got {other:?}"),
    }
    assert!(sink.responses.borrow().is_empty());
}

#[test]
fn updates_merge_into_the_record_while_showing() {
    let sink = Rc::new(RecordingSink::default());
    let mut service = created_service(&sink);
    let update = |total: &str| ActionRequest::Update {
        request_id: ID.to_owned(),
        details: IpcPaymentDetails::from_update(&plain_update(total)).expect("update"),
    };

    assert!(matches!(
        service.request_payment(action(update("60.00"), &sink)),
        Err(PaymentError::InvalidState(_))
    ));

    service
        .request_payment(action(simple("show"), &sink))
        .expect("show");
    service
        .request_payment(action(update("60.00"), &sink))
        .expect("update");
    let record = service.get_by_id(ID).expect("record");
    assert_eq!(record.details().total_item.amount.value, "60.00");
    assert_eq!(record.details().id, "test details");
    assert!(record.details().modifiers.is_some());
    assert_eq!(service.ui().updates.get(), 1);
}

#[test]
fn accepted_show_maps_onto_the_wire_response() {
    let response = ServiceResponse::Show {
        request_id: ID.to_owned(),
        status: AcceptStatus::Accepted,
        method_name: "VISA".to_owned(),
        data: "{}".to_owned(),
        payer_name: "Bill A. Pacheco".to_owned(),
        payer_email: String::new(),
        payer_phone: String::new(),
    };
    assert!(!response.is_terminal());
    match ActionResponse::from(response) {
        ActionResponse::Show {
            accepted,
            payer_name,
            ..
        } => {
            assert!(accepted);
            assert_eq!(payer_name, "Bill A. Pacheco");
        }
        other => panic!("expected a show result, got {other:?}"),
    }
}

#[test]
fn dead_actors_release_their_records() {
    let sink = Rc::new(RecordingSink::default());
    let mut service = created_service(&sink);
    service
        .request_payment(action(simple("can_make"), &sink))
        .expect("can make");

    sink.dead.set(true);
    assert_eq!(
        service.respond_payment(ServiceResponse::CanMake {
            request_id: ID.to_owned(),
            result: true,
        }),
        Err(PaymentError::NotInitialized)
    );
    assert!(sink.responses.borrow().is_empty());
    assert_eq!(service.purge_dead(), 1);
    assert!(service.enumerate().is_empty());
}

#[test]
fn dropped_actors_are_never_invoked() {
    let sink = Rc::new(RecordingSink::default());
    let mut service = created_service(&sink);
    service
        .request_payment(action(simple("complete"), &sink))
        .expect("complete");
    drop(sink);
    assert_eq!(
        service.respond_payment(ServiceResponse::Complete {
            request_id: ID.to_owned(),
            completed: true,
        }),
        Err(PaymentError::NotInitialized)
    );
    // complete is terminal regardless of delivery
    assert!(service.get_by_id(ID).is_none());
}
